/// Texture formats and format-label parsing

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    // 8-bit color
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,

    // HDR / packed color
    R16_SFLOAT,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32A32_SFLOAT,
    B10G11R11_UFLOAT,
    A2B10G10R10_UNORM,

    // Integer
    R32_UINT,
    R32G32B32A32_UINT,

    // Depth / stencil
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
    S8_UINT,
}

/// Format used whenever a label cannot be resolved
pub const DEFAULT_TEXTURE_FORMAT: TextureFormat = TextureFormat::R8G8B8A8_UNORM;

impl TextureFormat {
    /// Every format, in declaration order (used for enum-name matching)
    pub const ALL: &'static [TextureFormat] = &[
        TextureFormat::R8_UNORM,
        TextureFormat::R8G8_UNORM,
        TextureFormat::R8G8B8A8_UNORM,
        TextureFormat::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB,
        TextureFormat::R16_SFLOAT,
        TextureFormat::R16G16_SFLOAT,
        TextureFormat::R16G16B16A16_SFLOAT,
        TextureFormat::R32_SFLOAT,
        TextureFormat::R32G32_SFLOAT,
        TextureFormat::R32G32B32A32_SFLOAT,
        TextureFormat::B10G11R11_UFLOAT,
        TextureFormat::A2B10G10R10_UNORM,
        TextureFormat::R32_UINT,
        TextureFormat::R32G32B32A32_UINT,
        TextureFormat::D16_UNORM,
        TextureFormat::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT,
        TextureFormat::D32_SFLOAT_S8_UINT,
        TextureFormat::S8_UINT,
    ];

    /// Enum variant name
    pub fn name(self) -> &'static str {
        match self {
            TextureFormat::R8_UNORM => "R8_UNORM",
            TextureFormat::R8G8_UNORM => "R8G8_UNORM",
            TextureFormat::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
            TextureFormat::R8G8B8A8_SRGB => "R8G8B8A8_SRGB",
            TextureFormat::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
            TextureFormat::B8G8R8A8_SRGB => "B8G8R8A8_SRGB",
            TextureFormat::R16_SFLOAT => "R16_SFLOAT",
            TextureFormat::R16G16_SFLOAT => "R16G16_SFLOAT",
            TextureFormat::R16G16B16A16_SFLOAT => "R16G16B16A16_SFLOAT",
            TextureFormat::R32_SFLOAT => "R32_SFLOAT",
            TextureFormat::R32G32_SFLOAT => "R32G32_SFLOAT",
            TextureFormat::R32G32B32A32_SFLOAT => "R32G32B32A32_SFLOAT",
            TextureFormat::B10G11R11_UFLOAT => "B10G11R11_UFLOAT",
            TextureFormat::A2B10G10R10_UNORM => "A2B10G10R10_UNORM",
            TextureFormat::R32_UINT => "R32_UINT",
            TextureFormat::R32G32B32A32_UINT => "R32G32B32A32_UINT",
            TextureFormat::D16_UNORM => "D16_UNORM",
            TextureFormat::D32_SFLOAT => "D32_SFLOAT",
            TextureFormat::D24_UNORM_S8_UINT => "D24_UNORM_S8_UINT",
            TextureFormat::D32_SFLOAT_S8_UINT => "D32_SFLOAT_S8_UINT",
            TextureFormat::S8_UINT => "S8_UINT",
        }
    }

    /// Returns true for formats with a depth aspect
    pub fn has_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM
                | TextureFormat::D32_SFLOAT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_SFLOAT_S8_UINT
        )
    }

    /// Returns true for formats with a stencil aspect
    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_SFLOAT_S8_UINT
                | TextureFormat::S8_UINT
        )
    }

    /// Returns true for any depth and/or stencil format
    pub fn is_depth_stencil(self) -> bool {
        self.has_depth() || self.has_stencil()
    }

    /// Resolve a descriptor format label
    ///
    /// Resolution order: enum variant name (case-insensitive), then the
    /// lowercase alias table, then [`DEFAULT_TEXTURE_FORMAT`]. Never fails.
    pub fn from_label(label: &str) -> TextureFormat {
        let trimmed = label.trim();
        if let Some(format) = Self::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(trimmed))
        {
            return format;
        }

        let alias = trimmed.to_ascii_lowercase();
        match alias.as_str() {
            "r8" => TextureFormat::R8_UNORM,
            "rg8" => TextureFormat::R8G8_UNORM,
            "rgba8" | "rgba" | "rgba8_unorm" => TextureFormat::R8G8B8A8_UNORM,
            "srgb8_alpha8" | "rgba8_srgb" | "srgb" => TextureFormat::R8G8B8A8_SRGB,
            "bgra8" => TextureFormat::B8G8R8A8_UNORM,
            "bgra8_srgb" => TextureFormat::B8G8R8A8_SRGB,
            "r16f" => TextureFormat::R16_SFLOAT,
            "rg16f" => TextureFormat::R16G16_SFLOAT,
            "rgba16f" | "hdr" => TextureFormat::R16G16B16A16_SFLOAT,
            "r32f" => TextureFormat::R32_SFLOAT,
            "rg32f" => TextureFormat::R32G32_SFLOAT,
            "rgba32f" => TextureFormat::R32G32B32A32_SFLOAT,
            "r11g11b10f" | "r11f_g11f_b10f" => TextureFormat::B10G11R11_UFLOAT,
            "rgb10a2" | "rgb10_a2" => TextureFormat::A2B10G10R10_UNORM,
            "r32ui" => TextureFormat::R32_UINT,
            "rgba32ui" => TextureFormat::R32G32B32A32_UINT,
            "depth16" | "depth_component16" => TextureFormat::D16_UNORM,
            "depth32f" | "depth" | "depth_component32f" => TextureFormat::D32_SFLOAT,
            "depth24stencil8" | "depth24_stencil8" | "depthstencil" => TextureFormat::D24_UNORM_S8_UINT,
            "depth32fstencil8" | "depth32f_stencil8" => TextureFormat::D32_SFLOAT_S8_UINT,
            "stencil8" | "stencil_index8" => TextureFormat::S8_UINT,
            _ => DEFAULT_TEXTURE_FORMAT,
        }
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
