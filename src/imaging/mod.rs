//! Image processing: the backend capability and the local-codec pipeline.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Decode + orient** | `image` decoders, `apply_orientation` |
//! | **Resize** | `resize_exact`, CatmullRom or Lanczos3 |
//! | **Sharpen / color** | unsharp mask and modulation on RGBA8 buffers |
//! | **Encode → WebP** | `webp` (libwebp), lossy or lossless per quality |
//!
//! The module is split into:
//! - **Backend**: [`ProcessingBackend`] trait, shared by local and remote backends
//! - **Parameters**: [`LocalProfile`] describing how strongly each step acts
//! - **Calculations**: Pure decisions (resize, dimensions, filter, sharpening, lossless)
//! - **Operations**: Pixel operations the `image` crate doesn't provide
//! - **Local backend**: [`LocalBackend`] tying it all together

pub mod backend;
pub mod calculations;
pub mod local_backend;
pub mod operations;
pub mod params;

pub use backend::{BackendError, Concurrency, ProcessingBackend, WrittenVariant};
pub use local_backend::{LocalBackend, supported_input_extensions};
pub use params::LocalProfile;
