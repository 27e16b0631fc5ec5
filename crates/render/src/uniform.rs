use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

/// Scalar component type of a uniform member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Float,
    Sint,
    Uint,
}

/// Host-shareable type of a uniform member. Matrices are always `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Scalar(ScalarKind),
    Vector { size: u8, kind: ScalarKind },
    Matrix { columns: u8, rows: u8 },
}

impl UniformType {
    /// Distance between matrix columns: `vec2` columns pack to 8 bytes,
    /// `vec3`/`vec4` columns to 16.
    pub fn column_stride(self) -> usize {
        match self {
            Self::Matrix { rows: 2, .. } => 8,
            Self::Matrix { .. } => 16,
            _ => 0,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            Self::Scalar(_) => 4,
            Self::Vector { size, .. } => size as usize * 4,
            Self::Matrix { columns, .. } => columns as usize * self.column_stride(),
        }
    }

    fn is_integer_scalar(self) -> bool {
        matches!(self, Self::Scalar(ScalarKind::Sint | ScalarKind::Uint))
    }

    fn is_float_vector(self, n: u8) -> bool {
        self == Self::Vector {
            size: n,
            kind: ScalarKind::Float,
        }
    }

    fn is_square_matrix(self, n: u8) -> bool {
        self == Self::Matrix {
            columns: n,
            rows: n,
        }
    }
}

/// A named member of a uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub ty: UniformType,
}

impl UniformMember {
    pub fn new(name: impl Into<String>, offset: u32, ty: UniformType) -> Self {
        Self {
            name: name.into(),
            offset,
            ty,
        }
    }
}

/// Errors from building a uniform layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniformLayoutError {
    #[error("uniform `{name}` ends at byte {end}, past the block size {size}")]
    OutOfBounds { name: String, end: usize, size: u32 },
    #[error("uniform `{0}` is declared twice")]
    Duplicate(String),
}

/// Byte layout of one uniform block, usually reflected from shader source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniformLayout {
    members: Vec<UniformMember>,
    size: u32,
}

impl UniformLayout {
    pub fn new(members: Vec<UniformMember>, size: u32) -> Result<Self, UniformLayoutError> {
        for (i, member) in members.iter().enumerate() {
            let end = member.offset as usize + member.ty.byte_size();
            if end > size as usize {
                return Err(UniformLayoutError::OutOfBounds {
                    name: member.name.clone(),
                    end,
                    size,
                });
            }
            if members[..i].iter().any(|m| m.name == member.name) {
                return Err(UniformLayoutError::Duplicate(member.name.clone()));
            }
        }
        Ok(Self { members, size })
    }

    /// The `model`/`view`/`projection` block used by the built-in sphere shader.
    pub fn mvp() -> Self {
        let mat4 = UniformType::Matrix {
            columns: 4,
            rows: 4,
        };
        Self {
            members: vec![
                UniformMember::new("model", 0, mat4),
                UniformMember::new("view", 64, mat4),
                UniformMember::new("projection", 128, mat4),
            ],
            size: 192,
        }
    }

    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn members(&self) -> &[UniformMember] {
        &self.members
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

/// CPU-side storage for a uniform block with name-addressed setters.
///
/// Setting a name the layout does not declare does nothing. Setting a
/// declared name with a value of the wrong type logs a warning and leaves
/// the block unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0; layout.size() as usize];
        Self { layout, bytes }
    }

    /// Rebuild a block from a snapshot taken with [`UniformBlock::as_bytes`].
    pub fn from_bytes(layout: UniformLayout, bytes: Vec<u8>) -> Option<Self> {
        (bytes.len() == layout.size() as usize).then_some(Self { layout, bytes })
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layout.member(name).is_some()
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set_int(name, i32::from(value));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        if let Some(offset) = self.slot(name, "int", UniformType::is_integer_scalar) {
            self.put(offset, &value.to_ne_bytes());
        }
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        let accepts = |ty: UniformType| ty == UniformType::Scalar(ScalarKind::Float);
        if let Some(offset) = self.slot(name, "float", accepts) {
            self.put(offset, &value.to_ne_bytes());
        }
    }

    pub fn set_vec2(&mut self, name: &str, value: Vec2) {
        if let Some(offset) = self.slot(name, "vec2", |ty| ty.is_float_vector(2)) {
            self.put(offset, bytemuck::cast_slice(&value.to_array()));
        }
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        if let Some(offset) = self.slot(name, "vec3", |ty| ty.is_float_vector(3)) {
            self.put(offset, bytemuck::cast_slice(&value.to_array()));
        }
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) {
        if let Some(offset) = self.slot(name, "vec4", |ty| ty.is_float_vector(4)) {
            self.put(offset, bytemuck::cast_slice(&value.to_array()));
        }
    }

    pub fn set_mat2(&mut self, name: &str, value: &Mat2) {
        if let Some(offset) = self.slot(name, "mat2", |ty| ty.is_square_matrix(2)) {
            self.put_columns(offset, 8, &value.to_cols_array(), 2);
        }
    }

    pub fn set_mat3(&mut self, name: &str, value: &Mat3) {
        if let Some(offset) = self.slot(name, "mat3", |ty| ty.is_square_matrix(3)) {
            self.put_columns(offset, 16, &value.to_cols_array(), 3);
        }
    }

    pub fn set_mat4(&mut self, name: &str, value: &Mat4) {
        if let Some(offset) = self.slot(name, "mat4", |ty| ty.is_square_matrix(4)) {
            self.put_columns(offset, 16, &value.to_cols_array(), 4);
        }
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        let member = self.layout.member(name)?;
        member
            .ty
            .is_integer_scalar()
            .then(|| bytemuck::pod_read_unaligned(self.range(member.offset as usize, 4)))
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        let member = self.layout.member(name)?;
        (member.ty == UniformType::Scalar(ScalarKind::Float))
            .then(|| self.read_f32(member.offset as usize))
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        let member = self.layout.member(name)?;
        if !member.ty.is_float_vector(3) {
            return None;
        }
        let base = member.offset as usize;
        Some(Vec3::new(
            self.read_f32(base),
            self.read_f32(base + 4),
            self.read_f32(base + 8),
        ))
    }

    pub fn mat3(&self, name: &str) -> Option<Mat3> {
        let member = self.layout.member(name)?;
        if !member.ty.is_square_matrix(3) {
            return None;
        }
        let cols = self.read_columns(member.offset as usize, 16, 3, 3);
        Some(Mat3::from_cols_slice(&cols))
    }

    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        let member = self.layout.member(name)?;
        if !member.ty.is_square_matrix(4) {
            return None;
        }
        let cols = self.read_columns(member.offset as usize, 16, 4, 4);
        Some(Mat4::from_cols_slice(&cols))
    }

    fn slot(
        &self,
        name: &str,
        setter: &str,
        accepts: impl Fn(UniformType) -> bool,
    ) -> Option<usize> {
        let member = self.layout.member(name)?;
        if !accepts(member.ty) {
            tracing::warn!(
                uniform = name,
                declared = ?member.ty,
                setter,
                "uniform type mismatch, value ignored"
            );
            return None;
        }
        Some(member.offset as usize)
    }

    fn put(&mut self, offset: usize, data: &[u8]) {
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    fn put_columns(&mut self, offset: usize, stride: usize, values: &[f32], rows: usize) {
        for (c, column) in values.chunks_exact(rows).enumerate() {
            self.put(offset + c * stride, bytemuck::cast_slice(column));
        }
    }

    fn range(&self, offset: usize, len: usize) -> &[u8] {
        &self.bytes[offset..offset + len]
    }

    fn read_f32(&self, offset: usize) -> f32 {
        bytemuck::pod_read_unaligned(self.range(offset, 4))
    }

    fn read_columns(&self, offset: usize, stride: usize, columns: usize, rows: usize) -> Vec<f32> {
        (0..columns)
            .flat_map(|c| (0..rows).map(move |r| offset + c * stride + r * 4))
            .map(|at| self.read_f32(at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_layout() -> UniformLayout {
        UniformLayout::new(
            vec![
                UniformMember::new("time", 0, UniformType::Scalar(ScalarKind::Float)),
                UniformMember::new("flags", 4, UniformType::Scalar(ScalarKind::Sint)),
                UniformMember::new(
                    "tint",
                    16,
                    UniformType::Vector {
                        size: 3,
                        kind: ScalarKind::Float,
                    },
                ),
                UniformMember::new(
                    "normal",
                    32,
                    UniformType::Matrix {
                        columns: 3,
                        rows: 3,
                    },
                ),
                UniformMember::new(
                    "warp",
                    80,
                    UniformType::Matrix {
                        columns: 2,
                        rows: 2,
                    },
                ),
            ],
            96,
        )
        .unwrap()
    }

    #[test]
    fn mvp_layout_is_three_mat4() {
        let layout = UniformLayout::mvp();
        assert_eq!(layout.size(), 192);
        assert_eq!(layout.member("view").unwrap().offset, 64);
        assert_eq!(layout.member("projection").unwrap().offset, 128);
        assert!(layout.member("color").is_none());
    }

    #[test]
    fn mat4_round_trips_exactly() {
        let mut block = UniformBlock::new(UniformLayout::mvp());
        let view = Mat4::look_at_rh(Vec3::new(0.3, 5.0, 15.0), Vec3::ZERO, Vec3::Y);
        block.set_mat4("view", &view);
        assert_eq!(block.mat4("view"), Some(view));
        assert_eq!(block.mat4("model"), Some(Mat4::ZERO));
    }

    #[test]
    fn missing_uniform_is_a_silent_no_op() {
        let mut block = UniformBlock::new(UniformLayout::mvp());
        let before = block.as_bytes().to_vec();
        block.set_mat4("does_not_exist", &Mat4::IDENTITY);
        block.set_float("time", 1.0);
        block.set_bool("enabled", true);
        assert_eq!(block.as_bytes(), &before[..]);
    }

    #[test]
    fn type_mismatch_leaves_block_unchanged() {
        let mut block = UniformBlock::new(UniformLayout::mvp());
        let before = block.as_bytes().to_vec();
        block.set_float("model", 2.0);
        block.set_vec4("view", Vec4::ONE);
        block.set_mat3("projection", &Mat3::IDENTITY);
        assert_eq!(block.as_bytes(), &before[..]);
    }

    #[test]
    fn scalars_vectors_and_padded_matrices() {
        let mut block = UniformBlock::new(mixed_layout());
        block.set_float("time", 2.5);
        block.set_bool("flags", true);
        block.set_vec3("tint", Vec3::new(1.0, 0.5, 0.2));
        let normal = Mat3::from_cols_array(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        block.set_mat3("normal", &normal);
        block.set_mat2("warp", &Mat2::from_cols_array(&[1.0, 2.0, 3.0, 4.0]));

        assert_eq!(block.float("time"), Some(2.5));
        assert_eq!(block.int("flags"), Some(1));
        assert_eq!(block.vec3("tint"), Some(Vec3::new(1.0, 0.5, 0.2)));
        assert_eq!(block.mat3("normal"), Some(normal));

        // vec3 columns are padded to 16 bytes
        let second_column: f32 = bytemuck::pod_read_unaligned(&block.as_bytes()[48..52]);
        assert_eq!(second_column, 4.0);
        let padding: f32 = bytemuck::pod_read_unaligned(&block.as_bytes()[44..48]);
        assert_eq!(padding, 0.0);
        // mat2 columns pack to 8 bytes
        let warp_second: f32 = bytemuck::pod_read_unaligned(&block.as_bytes()[88..92]);
        assert_eq!(warp_second, 3.0);
    }

    #[test]
    fn set_int_writes_both_signednesses() {
        let layout = UniformLayout::new(
            vec![
                UniformMember::new("a", 0, UniformType::Scalar(ScalarKind::Sint)),
                UniformMember::new("b", 4, UniformType::Scalar(ScalarKind::Uint)),
            ],
            8,
        )
        .unwrap();
        let mut block = UniformBlock::new(layout);
        block.set_int("a", -7);
        block.set_int("b", 7);
        assert_eq!(block.int("a"), Some(-7));
        assert_eq!(block.int("b"), Some(7));
    }

    #[test]
    fn layout_rejects_overflow_and_duplicates() {
        let mat4 = UniformType::Matrix {
            columns: 4,
            rows: 4,
        };
        assert!(matches!(
            UniformLayout::new(vec![UniformMember::new("m", 16, mat4)], 64),
            Err(UniformLayoutError::OutOfBounds { end: 80, .. })
        ));
        assert_eq!(
            UniformLayout::new(
                vec![
                    UniformMember::new("m", 0, mat4),
                    UniformMember::new("m", 64, mat4)
                ],
                128
            ),
            Err(UniformLayoutError::Duplicate("m".into()))
        );
    }

    #[test]
    fn snapshot_restores_values() {
        let mut block = UniformBlock::new(UniformLayout::mvp());
        block.set_mat4("model", &Mat4::from_translation(Vec3::X));
        let restored =
            UniformBlock::from_bytes(UniformLayout::mvp(), block.as_bytes().to_vec()).unwrap();
        assert_eq!(restored, block);
        assert!(UniformBlock::from_bytes(UniformLayout::mvp(), vec![0; 3]).is_none());
    }
}
