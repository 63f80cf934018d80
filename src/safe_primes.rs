//! A pool of precomputed safe primes for tests.
//!
//! Finding safe primes of production size takes minutes per prime, which is
//! far too slow for a test suite; tests therefore draw from this
//! pregenerated pool instead. Never do this in a production deployment —
//! use [`crate::paillier::ThresholdKeyGenerator::generate`] and
//! [`crate::zkp::PublicParameters::generate`] so every group gets fresh
//! primes.

use lazy_static::lazy_static;
use libpaillier::unknown_order::BigNumber;

const SAFE_PRIMES_512: [&str; 4] = [
    concat!(
        "db4033c84417bfa448275d130aa4a2d09c043ed15bea4995bd89a5a167643eac",
        "8f540b180b1f80cc2c5f6905558c0dfd128b171159b02c4b702a5438ab8a5be3",
    ),
    concat!(
        "9a586f4757efece8097b1a097d990bbaa349fffb503e9b18b6d75948840be477",
        "4e4377f476b7e912fe1916803dcc012a265b76522e718d10b0e061f5284e9db7",
    ),
    concat!(
        "982a84e5669703d864b2f392244a4a73858801adaf5e92f1b11936475375b9a2",
        "93a5c23d7d4cf0b3d763ca6fe41f57eeebdfb7eb4c3653426e12b979f98ab777",
    ),
    concat!(
        "bec4b1a807f23b1fe03fbf4b46e125cd9a5de9da42b010647ba1940cafd4362b",
        "986996122f07c84632f689546f0e13d488cfc45d340d23cea1a1805c25fff22b",
    ),
];

const SAFE_PRIMES_1024: [&str; 6] = [
    concat!(
        "a110869102ee8dcc35280bfb9cb0ee00dacce5c6e994ac9276981763a2bc2ca6",
        "0d4e3e8d7928335f9ac7ad05fc7424259daf1ea519292d19996fb7cfa4467379",
        "14139b6fec857deb0b5e81c0bceefad003fc24855cdf458426ba178ca78142a9",
        "15095d17d485fa4a535c703d256e874af01859c95acdc3b6cd99e7d9aa0f6acb",
    ),
    concat!(
        "a36a4887442d3a00e75034c06c977bc60b38e9d8225a9f2ff017fe46ead94859",
        "4b8b511f6b498a3f7127a71ed539c8711384e2455f78f49bcad5f273432968f5",
        "e61ff63d68d388d1efcd27dfa877de1876096661d733f31201e146837d32a945",
        "c076efb8d3cfe1e4cba50f31162aebe9225228a9afed946e9b472b95a285bea3",
    ),
    concat!(
        "989267af6c319babc73c56ef164c2851e1237a9ac504f6730b3bfbbbcf24bf28",
        "21f40f5b5eef539a74df4b254cf37e5b79b006d32a437cc6d17f3867ed4cf328",
        "4c880e3263624f136478a9161619f32f6665f2482c18a2305079e9a02283fa30",
        "d084aeb9cab629309359aaf03bd565837d385cfdc742edd1c0b55b3a37d9e5b7",
    ),
    concat!(
        "87d8372e0372637fb5f50c7b412a9adcaad3f322626c500358350b5f4085a7aa",
        "2188499dae448b1880f370a46aeac18952067cb0daf44e5b6ebc96acf82176d2",
        "0a75358d38ff7621d2ea9e285b230f07be57d63c9b649dbbc4b8ee7cd2030d5c",
        "98832a7df4379ef4543deeea037d3d77897714031b31d2344ee9253d4763a13b",
    ),
    concat!(
        "ed4378fdfe91eaac0048fa619179cd69d9c17ea6f8166b84b8fe67ca9dbb7fb6",
        "7359711c7591e3302a03d062ede82354227064ac0e039ab59730abdd228fa259",
        "b67a62a3cbaac22193bd9ddc6790d0ab0664815743c0ef3c5a5a59b14b917606",
        "9ca489130d03f145d84768bcf2afe50c8ea21fc65c9f403785fc45172a3cd01f",
    ),
    concat!(
        "c2ad4990979c34938d9b8e6fe51cf525f134bbc729a4e1b4a9e876973253fed2",
        "933643b1aa811e14c05c3e17680b783c3db3a580801b6f88a406c01231e68132",
        "e4cab8a20497ec58fe209a2488bc4acb2c2c0e3ff074dd58e1f1d42fd66f16ba",
        "bd2a737c6b5e1d7eaa1935a49061ba6d8c6899d61e38538cdaf1fdca9021b2af",
    ),
];

lazy_static! {
    static ref POOL_512: Vec<BigNumber> = decode_pool(&SAFE_PRIMES_512);
    static ref POOL_1024: Vec<BigNumber> = decode_pool(&SAFE_PRIMES_1024);
}

fn decode_pool(pool: &[&str]) -> Vec<BigNumber> {
    pool.iter()
        .map(|p| BigNumber::from_slice(hex::decode(p).expect("static hex")))
        .collect()
}

/// 512-bit safe primes, suitable for the range-proof modulus in tests.
pub(crate) fn test_safe_primes_512() -> &'static [BigNumber] {
    &POOL_512
}

/// 1024-bit safe primes, suitable for the Paillier modulus in tests.
pub(crate) fn test_safe_primes_1024() -> &'static [BigNumber] {
    &POOL_1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_entries_are_safe_primes() {
        for p in test_safe_primes_512().iter().chain(test_safe_primes_1024()) {
            assert!(p.is_prime());
            let sophie_germain: BigNumber = (p - 1) / BigNumber::from(2);
            assert!(sophie_germain.is_prime());
        }
    }
}
