// Graph Nodes Module
// Individual node implementations

pub mod answer;
pub mod dual;
pub mod empathy;
pub mod intent;
pub mod refusal;
pub mod retrieve;

pub use answer::AnswerNode;
pub use dual::DualAnswerNode;
pub use empathy::EmpathyNode;
pub use intent::IntentNode;
pub use refusal::RefusalNode;
pub use retrieve::RetrieveNode;
