//! Mesh geometry and procedural shape generation
//!
//! Shapes are generated for a left-handed coordinate system with clockwise
//! front faces. Several shapes are usually packed into one [`MeshGeometry`]
//! as named submeshes sharing a vertex and index buffer.

use std::collections::HashMap;

use crate::foundation::math::{Vec2, Vec3};
use crate::render::{RenderError, RenderResult};
use crate::scene::bounds::Aabb;

/// Vertex layout consumed by every pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Surface normal
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
    /// Tangent along increasing u
    pub tangent: [f32; 3],
}

unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Vertex {
    /// Create a vertex
    pub fn new(position: Vec3, normal: Vec3, tex_coord: Vec2, tangent: Vec3) -> Self {
        Self {
            position: position.into(),
            normal: normal.into(),
            tex_coord: tex_coord.into(),
            tangent: tangent.into(),
        }
    }

    /// Position as a vector
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }
}

/// Generated shape: vertices plus triangle list indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Object-space bounds of the vertices
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(Vertex::position))
    }

    /// Triangles in the index buffer
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Axis-aligned box centered at the origin, 24 vertices
pub fn create_box(width: f32, height: f32, depth: f32) -> MeshData {
    let (w, h, d) = (width * 0.5, height * 0.5, depth * 0.5);
    let mut mesh = MeshData::default();

    let mut face = |corners: [Vec3; 4], normal: Vec3, tangent: Vec3| {
        let base = mesh.vertices.len() as u32;
        let uvs = [
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
        ];
        for (corner, uv) in corners.iter().zip(uvs) {
            mesh.vertices.push(Vertex::new(*corner, normal, uv, tangent));
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    };

    // front (-z)
    face(
        [Vec3::new(-w, -h, -d), Vec3::new(-w, h, -d), Vec3::new(w, h, -d), Vec3::new(w, -h, -d)],
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(1.0, 0.0, 0.0),
    );
    // back (+z)
    face(
        [Vec3::new(w, -h, d), Vec3::new(w, h, d), Vec3::new(-w, h, d), Vec3::new(-w, -h, d)],
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(-1.0, 0.0, 0.0),
    );
    // top (+y)
    face(
        [Vec3::new(-w, h, -d), Vec3::new(-w, h, d), Vec3::new(w, h, d), Vec3::new(w, h, -d)],
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
    );
    // bottom (-y)
    face(
        [Vec3::new(-w, -h, d), Vec3::new(-w, -h, -d), Vec3::new(w, -h, -d), Vec3::new(w, -h, d)],
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
    );
    // left (-x)
    face(
        [Vec3::new(-w, -h, d), Vec3::new(-w, h, d), Vec3::new(-w, h, -d), Vec3::new(-w, -h, -d)],
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, -1.0),
    );
    // right (+x)
    face(
        [Vec3::new(w, -h, -d), Vec3::new(w, h, -d), Vec3::new(w, h, d), Vec3::new(w, -h, d)],
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
    );

    mesh
}

/// UV sphere centered at the origin
pub fn create_sphere(radius: f32, slices: u32, stacks: u32) -> MeshData {
    let slices = slices.max(3);
    let stacks = stacks.max(2);
    let mut mesh = MeshData::default();

    mesh.vertices.push(Vertex::new(
        Vec3::new(0.0, radius, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec2::new(0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
    ));

    let phi_step = std::f32::consts::PI / stacks as f32;
    let theta_step = 2.0 * std::f32::consts::PI / slices as f32;

    for i in 1..stacks {
        let phi = i as f32 * phi_step;
        for j in 0..=slices {
            let theta = j as f32 * theta_step;
            let position = Vec3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.cos(),
                radius * phi.sin() * theta.sin(),
            );
            let tangent = Vec3::new(-phi.sin() * theta.sin(), 0.0, phi.sin() * theta.cos()).normalize();
            let uv = Vec2::new(theta / (2.0 * std::f32::consts::PI), phi / std::f32::consts::PI);
            mesh.vertices.push(Vertex::new(position, position.normalize(), uv, tangent));
        }
    }

    mesh.vertices.push(Vertex::new(
        Vec3::new(0.0, -radius, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec2::new(0.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
    ));

    for i in 1..=slices {
        mesh.indices.extend_from_slice(&[0, i + 1, i]);
    }

    let base = 1;
    let ring = slices + 1;
    for i in 0..stacks - 2 {
        for j in 0..slices {
            mesh.indices.extend_from_slice(&[
                base + i * ring + j,
                base + i * ring + j + 1,
                base + (i + 1) * ring + j,
                base + (i + 1) * ring + j,
                base + i * ring + j + 1,
                base + (i + 1) * ring + j + 1,
            ]);
        }
    }

    let south = mesh.vertices.len() as u32 - 1;
    let base = south - ring;
    for i in 0..slices {
        mesh.indices.extend_from_slice(&[south, base + i, base + i + 1]);
    }

    mesh
}

/// Flat grid in the xz-plane with `rows` x `columns` vertices
pub fn create_grid(width: f32, depth: f32, rows: u32, columns: u32) -> MeshData {
    let rows = rows.max(2);
    let columns = columns.max(2);
    let mut mesh = MeshData::default();

    let half_width = width * 0.5;
    let half_depth = depth * 0.5;

    // Outer rows and columns land exactly on the extents
    for i in 0..rows {
        let v = i as f32 / (rows - 1) as f32;
        let z = half_depth - depth * v;
        for j in 0..columns {
            let u = j as f32 / (columns - 1) as f32;
            let x = -half_width + width * u;
            mesh.vertices.push(Vertex::new(
                Vec3::new(x, 0.0, z),
                Vec3::new(0.0, 1.0, 0.0),
                Vec2::new(u, v),
                Vec3::new(1.0, 0.0, 0.0),
            ));
        }
    }

    for i in 0..rows - 1 {
        for j in 0..columns - 1 {
            mesh.indices.extend_from_slice(&[
                i * columns + j,
                i * columns + j + 1,
                (i + 1) * columns + j,
                (i + 1) * columns + j,
                i * columns + j + 1,
                (i + 1) * columns + j + 1,
            ]);
        }
    }

    mesh
}

/// Screen-aligned quad in NDC, used by the shadow debug view
pub fn create_quad(x: f32, y: f32, width: f32, height: f32, depth: f32) -> MeshData {
    let normal = Vec3::new(0.0, 0.0, -1.0);
    let tangent = Vec3::new(1.0, 0.0, 0.0);
    MeshData {
        vertices: vec![
            Vertex::new(Vec3::new(x, y - height, depth), normal, Vec2::new(0.0, 1.0), tangent),
            Vertex::new(Vec3::new(x, y, depth), normal, Vec2::new(0.0, 0.0), tangent),
            Vertex::new(Vec3::new(x + width, y, depth), normal, Vec2::new(1.0, 0.0), tangent),
            Vertex::new(Vec3::new(x + width, y - height, depth), normal, Vec2::new(1.0, 1.0), tangent),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

/// Range of a shared index buffer drawn as one item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Submesh {
    /// Indices in the range
    pub index_count: u32,
    /// First index of the range
    pub start_index: u32,
    /// Added to every index before fetching a vertex
    pub base_vertex: i32,
    /// Object-space bounds
    pub bounds: Aabb,
}

impl Submesh {
    /// Triangles in the range
    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

/// Immutable vertex/index storage with named submeshes
#[derive(Debug, Clone)]
pub struct MeshGeometry {
    name: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    submeshes: HashMap<String, Submesh>,
}

impl MeshGeometry {
    /// Create an empty geometry
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            indices: Vec::new(),
            submeshes: HashMap::new(),
        }
    }

    /// Create from already-imported buffers and submesh ranges
    pub fn from_parts(
        name: impl Into<String>,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        submeshes: impl IntoIterator<Item = (String, Submesh)>,
    ) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
            submeshes: submeshes.into_iter().collect(),
        }
    }

    /// Append a shape as a named submesh
    pub fn add_submesh(&mut self, name: impl Into<String>, data: MeshData) -> Submesh {
        let bounds = data
            .bounds()
            .unwrap_or_else(|| Aabb::new(Vec3::zeros(), Vec3::zeros()));
        let submesh = Submesh {
            index_count: data.indices.len() as u32,
            start_index: self.indices.len() as u32,
            base_vertex: self.vertices.len() as i32,
            bounds,
        };
        self.vertices.extend(data.vertices);
        self.indices.extend(data.indices);
        self.submeshes.insert(name.into(), submesh);
        submesh
    }

    /// Builder form of [`MeshGeometry::add_submesh`]
    pub fn with_submesh(mut self, name: impl Into<String>, data: MeshData) -> Self {
        self.add_submesh(name, data);
        self
    }

    /// Geometry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Named submesh range
    pub fn submesh(&self, name: &str) -> RenderResult<Submesh> {
        self.submeshes
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::MeshNotFound(format!("{}/{}", self.name, name)))
    }

    /// All vertices
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Triangle `triangle` of `submesh`, in object space
    pub fn triangle(&self, submesh: &Submesh, triangle: u32) -> Option<[Vec3; 3]> {
        if triangle >= submesh.triangle_count() {
            return None;
        }
        let first = (submesh.start_index + triangle * 3) as usize;
        let mut corners = [Vec3::zeros(); 3];
        for (k, corner) in corners.iter_mut().enumerate() {
            let index = *self.indices.get(first + k)? as i64 + submesh.base_vertex as i64;
            *corner = self.vertices.get(usize::try_from(index).ok()?)?.position();
        }
        Some(corners)
    }

    /// Triangles of `submesh` in index order
    pub fn triangles<'a>(&'a self, submesh: &'a Submesh) -> impl Iterator<Item = [Vec3; 3]> + 'a {
        (0..submesh.triangle_count()).filter_map(move |t| self.triangle(submesh, t))
    }
}
