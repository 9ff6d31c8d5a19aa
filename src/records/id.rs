use rand::Rng;

use crate::types::RecordTable;

const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LENGTH: usize = 6;

/// Human-readable ID such as `INC-7KQ2ZD`. Not unique; the primary key is.
#[must_use]
pub fn generate_formatted_id(table: RecordTable) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("{}-{suffix}", table.id_prefix())
}
