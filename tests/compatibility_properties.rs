use blood_compatibility::compatibility::*;
use blood_compatibility::BloodType;
use proptest::prelude::*;
use proptest::sample::select;

fn blood_type() -> impl Strategy<Value = BloodType> {
    select(BloodType::ALL.to_vec())
}

proptest! {
    #[test]
    fn every_type_can_donate_to_itself(t in blood_type()) {
        prop_assert!(is_compatible(t, t));
    }

    #[test]
    fn o_negative_donates_to_everyone(recipient in blood_type()) {
        prop_assert!(is_compatible(BloodType::ONeg, recipient));
    }

    #[test]
    fn ab_positive_receives_from_everyone(donor in blood_type()) {
        prop_assert!(is_compatible(donor, BloodType::AbPos));
    }

    #[test]
    fn o_negative_recipient_accepts_only_o_negative(donor in blood_type()) {
        prop_assert_eq!(is_compatible(donor, BloodType::ONeg), donor == BloodType::ONeg);
    }

    #[test]
    fn ab_positive_donor_only_gives_to_ab_positive(recipient in blood_type()) {
        prop_assert_eq!(is_compatible(BloodType::AbPos, recipient), recipient == BloodType::AbPos);
    }

    #[test]
    fn donate_and_receive_views_agree(donor in blood_type(), recipient in blood_type()) {
        let by_recipient = accepted_donors(recipient).contains(&donor);
        let by_donor = compatible_recipients(donor).contains(&recipient);
        prop_assert_eq!(by_recipient, by_donor);
        prop_assert_eq!(evaluate_pair(donor, recipient).compatible, by_recipient);
    }

    #[test]
    fn matrix_agrees_with_pair_checks(donor in blood_type(), recipient in blood_type()) {
        let matrix = build_compatibility_matrix();
        let cells: Vec<_> = matrix
            .iter()
            .filter(|e| e.donor == donor && e.recipient == recipient)
            .collect();
        prop_assert_eq!(cells.len(), 1);
        prop_assert_eq!(cells[0].compatible, is_compatible(donor, recipient));
    }

    #[test]
    fn selection_rows_follow_the_pair(donor in blood_type(), recipient in blood_type()) {
        for row in selection_table(donor, recipient) {
            prop_assert_eq!(row.receives_from_donor, is_compatible(donor, row.blood_type));
            prop_assert_eq!(row.donates_to_recipient, is_compatible(row.blood_type, recipient));
        }
    }

    #[test]
    fn text_outside_the_enumeration_is_rejected(text in "[a-z0-9 ]{0,6}") {
        prop_assume!(text.parse::<BloodType>().is_err());
        prop_assert!(check_compatibility(&text, "A+").is_err());
        prop_assert!(check_compatibility("A+", &text).is_err());
    }
}
