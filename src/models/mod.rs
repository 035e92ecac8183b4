pub mod bias;
pub mod event;
pub mod recording;
pub mod segment;

pub use bias::*;
pub use event::*;
pub use recording::*;
pub use segment::*;

use uuid::Uuid;

/// Namespace for every derived id in the cascade
const ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b8e_93d4_4a51_b7e2_0c5d_9a3f_1e47);

/// Name-based (v5) id, identical across runs for identical input
pub(crate) fn stable_id(name: &str) -> String {
    Uuid::new_v5(&ID_NAMESPACE, name.as_bytes()).to_string()
}
