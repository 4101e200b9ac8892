//! # Voxel Terrain Entry Point
//!
//! This is the main entry point for the headless terrain driver.
//! It simply calls into the library's `run()` function.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- terrain.json
//! ```

fn main() {
    voxel_terrain::run();
}
