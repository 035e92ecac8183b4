pub mod stage0_segment;
pub mod stage1_screen;
pub mod stage2_adjudicate;
pub mod stage3_route;

pub use stage0_segment::*;
pub use stage1_screen::*;
pub use stage2_adjudicate::*;
pub use stage3_route::*;
