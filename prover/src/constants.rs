/// Bit width of balances and transfer amounts. Every balance and amount is
/// range-checked to this width so field subtraction can never wrap.
pub const BALANCE_BITS: usize = 64;

/// Deepest account tree a circuit can be built for.
pub const MAX_TREE_DEPTH: usize = rollup_config::MAX_TREE_DEPTH;

/// Domain separator for account leaves: H(ds, pk.x, pk.y, index, nonce, balance)
pub const LEAF_DOMAIN: &[u8] = b"rollup:account-leaf:v1";

/// Domain separator for the signed transfer message: H(ds, nonce, to, amount)
pub const MESSAGE_DOMAIN: &[u8] = b"rollup:transfer-msg:v1";

/// Domain separator for the EdDSA challenge: H(ds, R.x, R.y, A.x, A.y, m)
pub const CHALLENGE_DOMAIN: &[u8] = b"rollup:eddsa-challenge:v1";

/// Domain separator for deterministic signing nonces (native only)
pub const NONCE_DOMAIN: &[u8] = b"rollup:eddsa-nonce:v1";
