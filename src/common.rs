pub const DEFAULT_PBES2_COUNT: u32 = 2048;
pub const DEFAULT_MAX_PBES2_COUNT: u32 = 10_000;
pub const DEFAULT_PBES2_SALT_LEN: usize = 16;

/// Settings shared by key management operations
#[derive(Clone, Debug)]
pub struct KeyManagementOptions {
    /// PBES2 iteration count used when the caller doesn't provide `p2c`
    pub pbes2_count: u32,

    /// Reject tokens whose `p2c` header exceeds this value
    pub max_pbes2_count: u32,

    /// Length of a generated `p2s` salt, in bytes
    pub pbes2_salt_len: usize,
}

impl Default for KeyManagementOptions {
    fn default() -> Self {
        KeyManagementOptions {
            pbes2_count: DEFAULT_PBES2_COUNT,
            max_pbes2_count: DEFAULT_MAX_PBES2_COUNT,
            pbes2_salt_len: DEFAULT_PBES2_SALT_LEN,
        }
    }
}
