use std::collections::HashSet;

use flow_viewer::{
    camera::ViewportRig,
    data_structures::{instance::Instance, mesh::DecodedMesh},
    render::{Drawn, MaterialDesc, RenderBackend},
    scene::ResourceSet,
};

/// Handle of a fake GPU resource.
#[derive(Debug, PartialEq, Eq)]
pub struct Handle(pub u64);

/// Counts what a real backend would have allocated on the GPU.
#[derive(Debug, Default)]
pub struct Ledger {
    pub geometries_created: usize,
    pub geometries_released: usize,
    pub materials_created: usize,
    pub materials_released: usize,
    pub instances_created: usize,
    pub instances_released: usize,
    pub draws: usize,
    /// Triangle count of the set passed to every draw, `None` for empty frames.
    pub drawn: Vec<Option<usize>>,
    pub detached: bool,
}

impl Ledger {
    pub fn live_geometries(&self) -> usize {
        self.geometries_created - self.geometries_released
    }

    pub fn live_materials(&self) -> usize {
        self.materials_created - self.materials_released
    }

    pub fn live_instances(&self) -> usize {
        self.instances_created - self.instances_released
    }

    pub fn live(&self) -> usize {
        self.live_geometries() + self.live_materials() + self.live_instances()
    }
}

#[derive(Debug, Default)]
pub struct TestBackend {
    pub ledger: Ledger,
    pub fail_geometry: bool,
    pub fail_material: bool,
    pub fail_instance: bool,
    next_id: u64,
    alive: HashSet<u64>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> Handle {
        self.next_id += 1;
        self.alive.insert(self.next_id);
        Handle(self.next_id)
    }

    fn free(&mut self, handle: Handle) {
        assert!(self.alive.remove(&handle.0), "{:?} released twice", handle);
    }
}

impl RenderBackend for TestBackend {
    type Geometry = Handle;
    type Material = Handle;
    type Instance = Handle;

    fn create_geometry(&mut self, _mesh: &DecodedMesh) -> anyhow::Result<Handle> {
        anyhow::ensure!(!self.fail_geometry, "out of vertex memory");
        self.ledger.geometries_created += 1;
        Ok(self.allocate())
    }

    fn create_material(&mut self, _desc: &MaterialDesc) -> anyhow::Result<Handle> {
        anyhow::ensure!(!self.fail_material, "out of uniform memory");
        self.ledger.materials_created += 1;
        Ok(self.allocate())
    }

    fn create_instance(&mut self, _instance: &Instance) -> anyhow::Result<Handle> {
        anyhow::ensure!(!self.fail_instance, "out of instance memory");
        self.ledger.instances_created += 1;
        Ok(self.allocate())
    }

    fn release_geometry(&mut self, geometry: Handle) {
        self.free(geometry);
        self.ledger.geometries_released += 1;
    }

    fn release_material(&mut self, material: Handle) {
        self.free(material);
        self.ledger.materials_released += 1;
    }

    fn release_instance(&mut self, instance: Handle) {
        self.free(instance);
        self.ledger.instances_released += 1;
    }

    fn draw(
        &mut self,
        live: Option<&ResourceSet<Self>>,
        _rig: &ViewportRig,
    ) -> anyhow::Result<Drawn> {
        assert!(!self.ledger.detached, "drew after detach");
        self.ledger.draws += 1;
        self.ledger.drawn.push(live.map(|set| set.triangles));
        Ok(Drawn::Presented)
    }

    fn detach(&mut self) {
        assert!(!self.ledger.detached, "detached twice");
        self.ledger.detached = true;
    }
}

pub type Triangle = [[f32; 3]; 3];

/// The twelve triangles of an axis aligned box.
pub fn box_triangles(min: [f32; 3], max: [f32; 3]) -> Vec<Triangle> {
    let c = |x: usize, y: usize, z: usize| {
        [
            if x == 0 { min[0] } else { max[0] },
            if y == 0 { min[1] } else { max[1] },
            if z == 0 { min[2] } else { max[2] },
        ]
    };
    let quads = [
        [c(0, 0, 0), c(0, 1, 0), c(1, 1, 0), c(1, 0, 0)],
        [c(0, 0, 1), c(1, 0, 1), c(1, 1, 1), c(0, 1, 1)],
        [c(0, 0, 0), c(0, 0, 1), c(0, 1, 1), c(0, 1, 0)],
        [c(1, 0, 0), c(1, 1, 0), c(1, 1, 1), c(1, 0, 1)],
        [c(0, 0, 0), c(1, 0, 0), c(1, 0, 1), c(0, 0, 1)],
        [c(0, 1, 0), c(0, 1, 1), c(1, 1, 1), c(1, 1, 0)],
    ];
    quads
        .iter()
        .flat_map(|[a, b, c, d]| [[*a, *b, *c], [*a, *c, *d]])
        .collect()
}

pub fn mesh_of(triangles: &[Triangle]) -> DecodedMesh {
    DecodedMesh::new(triangles.iter().flatten().copied().collect())
}

pub fn binary_stl(triangles: &[Triangle]) -> Vec<u8> {
    binary_stl_with_header(b"binary stl written by the test suite", triangles)
}

pub fn binary_stl_with_header(header: &[u8], triangles: &[Triangle]) -> Vec<u8> {
    let mut bytes = vec![0u8; 80];
    bytes[..header.len().min(80)].copy_from_slice(&header[..header.len().min(80)]);
    bytes.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for triangle in triangles {
        // zero normal, readers recompute it
        bytes.extend_from_slice(&[0u8; 12]);
        for corner in triangle {
            for c in corner {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        bytes.extend_from_slice(&[0u8; 2]);
    }
    bytes
}

pub fn ascii_stl(name: &str, triangles: &[Triangle]) -> String {
    let mut text = format!("solid {}\n", name);
    for triangle in triangles {
        text.push_str("  facet normal 0 0 1\n    outer loop\n");
        for [x, y, z] in triangle {
            text.push_str(&format!("      vertex {} {} {}\n", x, y, z));
        }
        text.push_str("    endloop\n  endfacet\n");
    }
    text.push_str(&format!("endsolid {}\n", name));
    text
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-4 * a.abs().max(b.abs()).max(1.0)
}
