use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{PoseidonConfig, find_poseidon_ark_and_mds};
use ark_ff::PrimeField;

static POSEIDON_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// Poseidon configuration shared by the native hasher and the gadget.
///
/// Field: BN254 Fr (254 bits)
/// Rate: 2
/// Capacity: 1
/// Security: 128 bits
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    POSEIDON_CONFIG.get_or_init(|| {
        let full_rounds: usize = 8;
        let partial_rounds: usize = 56;
        let alpha: u64 = 5;
        let rate: usize = 2;
        let capacity: usize = 1;

        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            Fr::MODULUS_BIT_SIZE as u64,
            rate,
            full_rounds as u64,
            partial_rounds as u64,
            0,
        );

        PoseidonConfig::new(
            full_rounds,
            partial_rounds,
            alpha,
            mds,
            ark,
            rate,
            capacity,
        )
    })
}
