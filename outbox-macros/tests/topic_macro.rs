use outbox_domain::error::DomainError;
use outbox_domain::event::Topic;
use outbox_macros::topic;

#[topic]
#[derive(PartialOrd, Ord)]
pub enum CatalogueTopic {
    ConventionSubmitted,
    ConventionSignedByBeneficiary,
    #[topic(name = "agency.updated")]
    AgencyUpdated,
}

#[test]
fn names_default_to_variant_identifiers() {
    assert_eq!(CatalogueTopic::ConventionSubmitted.as_str(), "ConventionSubmitted");
    assert_eq!(
        CatalogueTopic::ConventionSignedByBeneficiary.to_string(),
        "ConventionSignedByBeneficiary"
    );
    assert_eq!(CatalogueTopic::AgencyUpdated.as_str(), "agency.updated");
}

#[test]
fn from_name_resolves_only_known_topics() {
    assert_eq!(
        CatalogueTopic::from_name("agency.updated"),
        Some(CatalogueTopic::AgencyUpdated)
    );
    assert_eq!(CatalogueTopic::from_name("AgencyUpdated"), None);
    assert!(matches!(
        CatalogueTopic::parse_name("ConventionRejected"),
        Err(DomainError::UnknownTopic { name }) if name == "ConventionRejected"
    ));
}

#[test]
fn all_lists_variants_in_declaration_order() {
    assert_eq!(
        CatalogueTopic::all(),
        &[
            CatalogueTopic::ConventionSubmitted,
            CatalogueTopic::ConventionSignedByBeneficiary,
            CatalogueTopic::AgencyUpdated,
        ]
    );
    for topic in CatalogueTopic::all() {
        assert_eq!(CatalogueTopic::from_name(topic.as_str()), Some(*topic));
    }
}

#[test]
fn serde_names_match_topic_names() {
    let json = serde_json::to_string(&CatalogueTopic::AgencyUpdated).unwrap();
    assert_eq!(json, "\"agency.updated\"");

    let parsed: CatalogueTopic = serde_json::from_str("\"ConventionSubmitted\"").unwrap();
    assert_eq!(parsed, CatalogueTopic::ConventionSubmitted);
}

#[test]
fn user_derives_are_kept() {
    assert!(CatalogueTopic::ConventionSubmitted < CatalogueTopic::AgencyUpdated);
}
