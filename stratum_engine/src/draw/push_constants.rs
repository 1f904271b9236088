/// Push constant payloads
///
/// A closed set of payload kinds, each knowing its bytes and the shader
/// stages it targets. Payloads are re-pushed for every draw.

use std::borrow::Cow;

use glam::{Mat4, Vec4};

use crate::graphics_device::ShaderStageFlags;

#[derive(Debug, Clone, PartialEq)]
pub enum PushConstants {
    /// Model matrix followed by a tint color (80 bytes, vertex + fragment)
    ModelTint { model: Mat4, tint: Vec4 },
    /// Tint color only (16 bytes, fragment)
    Tint(Vec4),
    /// Arbitrary bytes for arbitrary stages
    Raw { stages: ShaderStageFlags, offset: u32, bytes: Vec<u8> },
}

impl PushConstants {
    pub fn stages(&self) -> ShaderStageFlags {
        match self {
            PushConstants::ModelTint { .. } => ShaderStageFlags::VERTEX_FRAGMENT,
            PushConstants::Tint(_) => ShaderStageFlags::FRAGMENT,
            PushConstants::Raw { stages, .. } => *stages,
        }
    }

    /// Byte offset into the push constant range
    pub fn offset(&self) -> u32 {
        match self {
            PushConstants::Raw { offset, .. } => *offset,
            _ => 0,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            PushConstants::ModelTint { .. } => 80,
            PushConstants::Tint(_) => 16,
            PushConstants::Raw { bytes, .. } => bytes.len(),
        }
    }

    /// Payload bytes in shader layout (column-major matrices)
    pub fn bytes(&self) -> Cow<'_, [u8]> {
        match self {
            PushConstants::ModelTint { model, tint } => {
                let mut data = [0.0f32; 20];
                data[..16].copy_from_slice(&model.to_cols_array());
                data[16..].copy_from_slice(&tint.to_array());
                Cow::Owned(bytemuck::cast_slice::<f32, u8>(&data[..]).to_vec())
            }
            PushConstants::Tint(tint) => Cow::Borrowed(bytemuck::bytes_of(tint)),
            PushConstants::Raw { bytes, .. } => Cow::Borrowed(bytes),
        }
    }
}

#[cfg(test)]
#[path = "push_constants_tests.rs"]
mod tests;
