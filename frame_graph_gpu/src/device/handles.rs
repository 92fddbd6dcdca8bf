/// Opaque GPU object handles
///
/// Every handle is a 64-bit value owned by the backend (a `VkImage`,
/// an `ID3D12Resource*`, a mock counter...). The core never interprets
/// the value; it only stores, compares and hashes it.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u64);

        impl $name {
            /// The null handle (no object)
            pub const NULL: Self = Self(0);

            /// Wrap a raw backend handle value
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw backend handle value
            pub const fn as_raw(self) -> u64 {
                self.0
            }

            /// Whether this is the null handle
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

define_handle!(
    /// GPU image (texture) object
    ImageHandle
);
define_handle!(
    /// View over an image (sampled view or attachment view)
    ImageViewHandle
);
define_handle!(
    /// Sampler object
    SamplerHandle
);
define_handle!(
    /// Device memory block backing an image or buffer
    MemoryHandle
);
define_handle!(
    /// GPU buffer object
    BufferHandle
);
define_handle!(
    /// Framebuffer object (render pass attachment set)
    FramebufferHandle
);
define_handle!(
    /// Descriptor pool object
    DescriptorPoolHandle
);
define_handle!(
    /// Descriptor set allocated from a pool
    DescriptorSetHandle
);
define_handle!(
    /// Descriptor set layout object
    DescriptorSetLayoutHandle
);

/// Index of a rotating per-frame resource set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameSlot(pub usize);

impl FrameSlot {
    /// Slot index as usize
    pub fn index(self) -> usize {
        self.0
    }
}
