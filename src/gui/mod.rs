pub mod assets;
pub mod camera;
pub mod connections;
pub mod drag;
pub mod frontend;
pub mod reconcile;
pub mod scene;
