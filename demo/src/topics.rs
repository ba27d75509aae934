//! 主题目录与载荷

use outbox_domain::event::TopicPayload;
use outbox_macros::topic;
use serde::{Deserialize, Serialize};

#[topic]
pub enum DemoTopic {
    ConventionSubmitted,
    ConventionSignedByBeneficiary,
    #[topic(name = "agency.updated")]
    AgencyUpdated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConventionSubmitted {
    pub convention_id: String,
    pub beneficiary_email: String,
    pub submitted_by: Option<String>,
}

impl TopicPayload for ConventionSubmitted {
    type Topic = DemoTopic;
    const TOPIC: DemoTopic = DemoTopic::ConventionSubmitted;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConventionSignedByBeneficiary {
    pub convention_id: String,
}

impl TopicPayload for ConventionSignedByBeneficiary {
    type Topic = DemoTopic;
    const TOPIC: DemoTopic = DemoTopic::ConventionSignedByBeneficiary;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyUpdated {
    pub agency_id: String,
    pub name: String,
}

impl TopicPayload for AgencyUpdated {
    type Topic = DemoTopic;
    const TOPIC: DemoTopic = DemoTopic::AgencyUpdated;
}
