//! Built-in demo geometry.

use vkframe_app::SceneData;
use vkframe_core::Vertex;

/// One RGB triangle in clip space, drawn without indices.
pub fn triangle() -> SceneData {
    SceneData::vertices(vec![
        Vertex::new([0.0, -0.5], [1.0, 0.0, 0.0]),
        Vertex::new([0.5, 0.5], [0.0, 1.0, 0.0]),
        Vertex::new([-0.5, 0.5], [0.0, 0.0, 1.0]),
    ])
}

/// A unit quad as two indexed triangles sharing a diagonal.
pub fn quad() -> SceneData {
    SceneData::indexed(
        vec![
            Vertex::new([-0.5, -0.5], [1.0, 0.0, 0.0]),
            Vertex::new([0.5, -0.5], [0.0, 1.0, 0.0]),
            Vertex::new([0.5, 0.5], [0.0, 0.0, 1.0]),
            Vertex::new([-0.5, 0.5], [1.0, 1.0, 1.0]),
        ],
        vec![0, 1, 2, 2, 3, 0],
    )
}
