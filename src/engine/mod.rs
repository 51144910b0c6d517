// Engine module: ECS glue, camera, input, overlay and mesh building for the
// shoal viewer. Nothing here touches the simulation internals; systems reach
// the flock only through the `Shoal` resource.

pub mod camera;
pub mod clock;
pub mod debug_overlay;
pub mod input;
pub mod lathe;
pub mod mesh;
pub mod resources;
pub mod systems;

pub use clock::WorldClock;
pub use resources::{Shoal, SimStats};
