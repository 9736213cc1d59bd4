//! Scene content stored in a `hecs` world.
//!
//! Every scene owns one [`SceneContent`]: a 3D root node, an optional 2D
//! overlay root, and whatever entities hang below them. Entities reference
//! GPU resources by id ([`MeshId`], [`TextureId`], [`FontId`]); the ids carry
//! the [`AssetManager`](crate::AssetManager) epoch they were issued in, so an
//! id from a torn-down scene never resolves to a resource of the next one.

use hecs::{Entity, World};

use crate::mesh::Transform;

/// RGBA color, components in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(0.9, 0.2, 0.2);
    pub const MAGENTA: Color = Color::rgb(1.0, 0.0, 1.0);
    /// Default clear color.
    pub const SLATE: Color = Color::rgb(0.08, 0.09, 0.12);

    /// Multiply RGB by `factor`, keeping alpha.
    pub fn dimmed(self, factor: f32) -> Self {
        Self::rgba(self.r * factor, self.g * factor, self.b * factor, self.a)
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

macro_rules! asset_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name {
            pub(crate) index: u32,
            pub(crate) epoch: u32,
        }
    };
}

asset_id!(
    /// Handle to a mesh in the asset manager.
    MeshId
);
asset_id!(
    /// Handle to a texture in the asset manager.
    TextureId
);
asset_id!(
    /// Handle to a font atlas in the asset manager.
    FontId
);
asset_id!(
    /// Handle to a shader in the asset manager.
    ShaderId
);

/// Name and parent of a scene-graph node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub parent: Option<Entity>,
}

/// Draws a mesh at the entity's [`Transform`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderMesh {
    pub mesh: MeshId,
    pub color: Color,
    pub texture: Option<TextureId>,
}

impl RenderMesh {
    pub fn new(mesh: MeshId, color: Color) -> Self {
        Self {
            mesh,
            color,
            texture: None,
        }
    }

    pub fn with_texture(mesh: MeshId, color: Color, texture: TextureId) -> Self {
        Self {
            mesh,
            color,
            texture: Some(texture),
        }
    }
}

/// Text on the 2D overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    pub font: Option<FontId>,
    pub color: Color,
}

/// Everything reachable from a scene's roots.
pub struct SceneContent {
    world: World,
    root: Entity,
    overlay: Option<Entity>,
}

impl SceneContent {
    /// A world holding just the 3D root node.
    pub fn new(name: impl Into<String>) -> Self {
        let mut world = World::new();
        let root = world.spawn((
            Node {
                name: name.into(),
                parent: None,
            },
            Transform::new(),
        ));
        Self {
            world,
            root,
            overlay: None,
        }
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn overlay(&self) -> Option<Entity> {
        self.overlay
    }

    /// The 2D overlay root, created on first use.
    pub fn overlay_root(&mut self) -> Entity {
        if let Some(overlay) = self.overlay {
            return overlay;
        }
        let overlay = self.world.spawn((Node {
            name: "overlay".to_string(),
            parent: None,
        },));
        self.overlay = Some(overlay);
        overlay
    }

    /// Spawn a child node. Extra components go in with
    /// [`world_mut`](Self::world_mut)`.insert_one`.
    pub fn spawn_node(&mut self, parent: Entity, name: impl Into<String>, transform: Transform) -> Entity {
        self.world.spawn((
            Node {
                name: name.into(),
                parent: Some(parent),
            },
            transform,
        ))
    }

    /// Spawn a mesh node below the 3D root.
    pub fn spawn_mesh(&mut self, name: impl Into<String>, transform: Transform, mesh: RenderMesh) -> Entity {
        let node = Node {
            name: name.into(),
            parent: Some(self.root),
        };
        self.world.spawn((node, transform, mesh))
    }

    /// Spawn a text label below the overlay root.
    pub fn spawn_label(&mut self, label: Label) -> Entity {
        let overlay = self.overlay_root();
        self.world.spawn((
            Node {
                name: label.text.clone(),
                parent: Some(overlay),
            },
            label,
        ))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn node_count(&self) -> usize {
        self.world.query::<&Node>().iter().count()
    }

    pub fn mesh_count(&self) -> usize {
        self.world.query::<&RenderMesh>().iter().count()
    }

    pub fn children(&self, parent: Entity) -> Vec<Entity> {
        self.world
            .query::<&Node>()
            .iter()
            .filter(|(_, node)| node.parent == Some(parent))
            .map(|(entity, _)| entity)
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<Entity> {
        self.world
            .query::<&Node>()
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(entity, _)| entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn mesh_id() -> MeshId {
        MeshId { index: 0, epoch: 0 }
    }

    #[test]
    fn nodes_hang_below_the_root() {
        let mut content = SceneContent::new("Lobby");
        let root = content.root();
        let arm = content.spawn_node(root, "arm", Transform::from_position(Vec3::X));
        content.spawn_mesh("cube", Transform::new(), RenderMesh::new(mesh_id(), Color::RED));

        assert_eq!(content.node_count(), 3);
        assert_eq!(content.mesh_count(), 1);
        assert_eq!(content.children(root).len(), 2);
        assert_eq!(content.find("arm"), Some(arm));
    }

    #[test]
    fn overlay_is_created_once() {
        let mut content = SceneContent::new("Hud");
        assert_eq!(content.overlay(), None);

        content.spawn_label(Label {
            text: "Hello".into(),
            font: None,
            color: Color::WHITE,
        });
        let overlay = content.overlay().unwrap();
        assert_eq!(content.overlay_root(), overlay);
        assert_eq!(content.children(overlay).len(), 1);
    }

    #[test]
    fn dimmed_keeps_alpha() {
        let c = Color::rgba(1.0, 0.5, 0.0, 0.8).dimmed(0.5);
        assert_eq!(c, Color::rgba(0.5, 0.25, 0.0, 0.8));
    }
}
