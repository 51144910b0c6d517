// Flume Shoal: a CPU-simulated shoal of fish drawn with one instanced draw call.
//
// `flock` is the simulation core and has no rendering dependencies.
// `engine` holds the pieces the window/GPU front end in main.rs is built from.

pub mod engine;
pub mod flock;
