pub mod capsule;
pub mod circle;

pub use capsule::{Capsule, CapsuleCache};
pub use circle::Circle;
