//! Built-in sRGB colour profile.
//!
//! Prints must always carry a colour profile. When the source had none and no
//! profile file is configured, [`srgb_profile`] supplies a compact ICC v2
//! display profile: D50-adapted sRGB primaries with a 2.2 gamma curve.

use std::sync::LazyLock;

static SRGB: LazyLock<Vec<u8>> = LazyLock::new(build_srgb_profile);

/// Compact sRGB ICC profile bytes.
pub fn srgb_profile() -> &'static [u8] {
    &SRGB
}

const HEADER_LEN: usize = 128;
const TAG_ENTRY_LEN: usize = 12;

fn s15_fixed16(v: f64) -> [u8; 4] {
    ((v * 65536.0).round() as i32).to_be_bytes()
}

fn xyz_tag(x: f64, y: f64, z: f64) -> Vec<u8> {
    let mut out = b"XYZ \0\0\0\0".to_vec();
    for v in [x, y, z] {
        out.extend_from_slice(&s15_fixed16(v));
    }
    out
}

fn curve_tag(gamma: f64) -> Vec<u8> {
    let mut out = b"curv\0\0\0\0".to_vec();
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&((gamma * 256.0).round() as u16).to_be_bytes());
    out
}

fn text_tag(text: &str) -> Vec<u8> {
    let mut out = b"text\0\0\0\0".to_vec();
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    out
}

fn desc_tag(text: &str) -> Vec<u8> {
    let mut out = b"desc\0\0\0\0".to_vec();
    out.extend_from_slice(&(text.len() as u32 + 1).to_be_bytes());
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    // Empty Unicode and ScriptCode descriptions
    out.extend_from_slice(&[0; 4 + 4 + 2 + 1 + 67]);
    out
}

fn build_srgb_profile() -> Vec<u8> {
    let curve = curve_tag(2.2);
    let tags: Vec<(&[u8; 4], Vec<u8>)> = vec![
        (b"desc", desc_tag("sRGB (compact)")),
        (b"cprt", text_tag("No copyright, use freely")),
        (b"wtpt", xyz_tag(0.9642, 1.0, 0.8249)),
        (b"rXYZ", xyz_tag(0.4361, 0.2225, 0.0139)),
        (b"gXYZ", xyz_tag(0.3851, 0.7169, 0.0971)),
        (b"bXYZ", xyz_tag(0.1431, 0.0606, 0.7141)),
        (b"rTRC", curve.clone()),
        (b"gTRC", curve.clone()),
        (b"bTRC", curve),
    ];

    let table_len = 4 + tags.len() * TAG_ENTRY_LEN;
    let mut table = (tags.len() as u32).to_be_bytes().to_vec();
    let mut data = Vec::new();
    let mut offset = HEADER_LEN + table_len;
    for (sig, body) in &tags {
        table.extend_from_slice(*sig);
        table.extend_from_slice(&(offset as u32).to_be_bytes());
        table.extend_from_slice(&(body.len() as u32).to_be_bytes());
        data.extend_from_slice(body);
        while data.len() % 4 != 0 {
            data.push(0);
        }
        offset = HEADER_LEN + table_len + data.len();
    }

    let total = HEADER_LEN + table_len + data.len();
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(&(total as u32).to_be_bytes());
    header.extend_from_slice(&[0; 4]); // preferred CMM
    header.extend_from_slice(&0x0210_0000u32.to_be_bytes()); // version 2.1
    header.extend_from_slice(b"mntr");
    header.extend_from_slice(b"RGB ");
    header.extend_from_slice(b"XYZ ");
    for part in [2024u16, 1, 1, 0, 0, 0] {
        header.extend_from_slice(&part.to_be_bytes());
    }
    header.extend_from_slice(b"acsp");
    header.extend_from_slice(&[0; 4 + 4 + 4 + 4 + 8 + 4]); // platform .. rendering intent
    for v in [0.9642, 1.0, 0.8249] {
        header.extend_from_slice(&s15_fixed16(v));
    }
    header.resize(HEADER_LEN, 0);

    let mut profile = header;
    profile.extend_from_slice(&table);
    profile.extend_from_slice(&data);
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_be_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn header_is_well_formed() {
        let p = srgb_profile();
        assert_eq!(u32_at(p, 0) as usize, p.len());
        assert_eq!(&p[12..16], b"mntr");
        assert_eq!(&p[16..20], b"RGB ");
        assert_eq!(&p[36..40], b"acsp");
        assert_eq!(p.len() % 4, 0);
    }

    #[test]
    fn illuminant_is_d50() {
        let p = srgb_profile();
        assert_eq!(&p[68..72], &s15_fixed16(0.9642));
        assert_eq!(u32_at(p, 72), 0x0001_0000);
    }

    #[test]
    fn tag_table_points_inside_profile() {
        let p = srgb_profile();
        let count = u32_at(p, HEADER_LEN) as usize;
        assert_eq!(count, 9);
        for i in 0..count {
            let entry = HEADER_LEN + 4 + i * TAG_ENTRY_LEN;
            let offset = u32_at(p, entry + 4) as usize;
            let size = u32_at(p, entry + 8) as usize;
            assert_eq!(offset % 4, 0);
            assert!(offset + size <= p.len());
        }
    }

    #[test]
    fn gamma_curve_is_2_2() {
        let curve = curve_tag(2.2);
        assert_eq!(&curve[0..4], b"curv");
        assert_eq!(u16::from_be_bytes([curve[12], curve[13]]), 563);
    }
}
