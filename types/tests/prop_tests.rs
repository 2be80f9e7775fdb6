use proptest::prelude::*;

use agora_types::{AccountId, ProposalId, Ratio, Timestamp};

proptest! {
    /// AccountId hex roundtrip: new -> display -> from_hex is identity.
    #[test]
    fn account_id_hex_roundtrip(bytes in prop::array::uniform20(0u8..)) {
        let id = AccountId::new(bytes);
        let parsed = AccountId::from_hex(&id.to_string()).unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// AccountId bincode roundtrip.
    #[test]
    fn account_id_bincode_roundtrip(bytes in prop::array::uniform20(0u8..)) {
        let id = AccountId::new(bytes);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: AccountId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// ProposalId key bytes preserve ordering.
    #[test]
    fn proposal_id_key_order(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ka = ProposalId::new(a).to_key_bytes();
        let kb = ProposalId::new(b).to_key_bytes();
        prop_assert_eq!(a < b, ka < kb);
        prop_assert_eq!(a == b, ka == kb);
    }

    /// Timestamp ordering matches the underlying seconds.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
    }

    /// Cross-multiplied comparison agrees with exact rational semantics.
    ///
    /// For fractions that fit in u64 the comparison can be checked against
    /// the widened native product.
    #[test]
    fn ratio_comparison_agrees_with_widened_product(
        rn in 1u64..1000,
        rd_extra in 0u64..1000,
        num in 0u64..1_000_000,
        den in 1u64..1_000_000,
    ) {
        let rd = rn + rd_extra; // guarantees rn <= rd
        let ratio = Ratio::new(rn, rd).unwrap();
        let expect_gt = (num as u128) * (rd as u128) > (rn as u128) * (den as u128);
        let expect_ge = (num as u128) * (rd as u128) >= (rn as u128) * (den as u128);
        prop_assert_eq!(ratio.lt_frac(num as u128, den as u128), expect_gt);
        prop_assert_eq!(ratio.le_frac(num as u128, den as u128), expect_ge);
    }

    /// lt_frac implies le_frac.
    #[test]
    fn ratio_strict_implies_weak(
        rn in 1u64..100,
        rd_extra in 0u64..100,
        num in 0u128..u64::MAX as u128,
        den in 1u128..u64::MAX as u128,
    ) {
        let ratio = Ratio::new(rn, rn + rd_extra).unwrap();
        if ratio.lt_frac(num, den) {
            prop_assert!(ratio.le_frac(num, den));
        }
    }
}
