// TRS transform for Xform prims
//
// USD writes matrices in row-vector convention (p' = p * M, translation in
// the last row). glam is column-vector (p' = M * p, translation in the last
// column), so a USD row is a glam column.

use glam::{Mat4, Quat, Vec3};
use serde::Serialize;

/// Transform components that can be composed into a matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Transform {
    /// Translation
    pub translation: Vec3,

    /// Rotation as a quaternion, stored (x, y, z, w)
    pub rotation: Quat,

    /// Scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Create a new transform from a 4x4 matrix.
    ///
    /// Decomposes the matrix into translation, rotation, and scale.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Check whether this is exactly the identity transform.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// The rotation normalized for matrix composition.
    ///
    /// A zero-length (or non-finite) quaternion carries no orientation and
    /// is treated as identity.
    pub fn unit_rotation(&self) -> Quat {
        let len_sq = self.rotation.length_squared();
        if !len_sq.is_finite() || len_sq < 1e-12 {
            Quat::IDENTITY
        } else {
            self.rotation.normalize()
        }
    }

    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.unit_rotation(), self.translation)
    }

    /// Matrix rows in USD's row-vector layout, ready for `matrix4d` output.
    pub fn to_usd_rows(&self) -> [[f32; 4]; 4] {
        self.to_matrix().to_cols_array_2d()
    }

    /// Rebuild a transform from USD `matrix4d` rows.
    pub fn from_usd_rows(rows: [[f32; 4]; 4]) -> Self {
        let matrix = Mat4::from_cols_array_2d(&rows);
        if matrix == Mat4::IDENTITY {
            return Self::IDENTITY;
        }
        Self::from_matrix(matrix)
    }
}
