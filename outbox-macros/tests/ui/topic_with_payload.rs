use outbox_domain::event::{EventFactory, TopicPayload};
use outbox_macros::topic;
use serde::{Deserialize, Serialize};

#[topic]
#[derive(Serialize)]
pub enum AgencyTopic {
    AgencyRegistered,
}

#[derive(Serialize, Deserialize)]
struct AgencyRegistered {
    agency_id: String,
}

impl TopicPayload for AgencyRegistered {
    type Topic = AgencyTopic;
    const TOPIC: AgencyTopic = AgencyTopic::AgencyRegistered;
}

fn main() {
    let factory = EventFactory::<AgencyTopic>::default();
    let event = factory
        .event_for(&AgencyRegistered {
            agency_id: "a-1".into(),
        })
        .unwrap();
    assert_eq!(event.topic(), AgencyTopic::AgencyRegistered);
}
