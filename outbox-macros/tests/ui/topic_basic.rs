use outbox_domain::event::Topic;
use outbox_macros::topic;

#[topic]
enum ConventionTopic {
    ConventionSubmitted,
    #[topic(name = "convention.signed")]
    ConventionSigned,
}

fn main() {
    assert_eq!(ConventionTopic::ConventionSigned.as_str(), "convention.signed");
    assert_eq!(ConventionTopic::all().len(), 2);
}
