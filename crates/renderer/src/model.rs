use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity key for a model. Two models are the same cache entry only if
/// they are the same `Model` value, regardless of geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(u64);

/// One addressable point: normalized position plus its index into the
/// per-point color buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPoint {
    pub index: u32,
    /// Normalized coordinates, 0..1 on each axis.
    pub xn: f32,
    pub yn: f32,
    pub zn: f32,
}

/// A view of the installation's points, as seen by shaders. Geometry
/// construction happens upstream; the engine only samples coordinates.
#[derive(Debug, Clone)]
pub struct Model {
    id: ModelId,
    points: Vec<ModelPoint>,
}

impl Model {
    pub fn new(points: Vec<ModelPoint>) -> Self {
        Self {
            id: ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed)),
            points,
        }
    }

    /// A synthetic flat grid, useful for previews and tests.
    pub fn grid(cols: u32, rows: u32) -> Self {
        let mut points = Vec::with_capacity((cols * rows) as usize);
        for row in 0..rows {
            for col in 0..cols {
                points.push(ModelPoint {
                    index: row * cols + col,
                    xn: if cols > 1 {
                        col as f32 / (cols - 1) as f32
                    } else {
                        0.5
                    },
                    yn: if rows > 1 {
                        row as f32 / (rows - 1) as f32
                    } else {
                        0.5
                    },
                    zn: 0.5,
                });
            }
        }
        Self::new(points)
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn points(&self) -> &[ModelPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_get_distinct_ids() {
        let a = Model::grid(2, 2);
        let b = Model::grid(2, 2);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn grid_normalizes_coordinates() {
        let model = Model::grid(3, 3);
        assert_eq!(model.len(), 9);
        let last = model.points().last().unwrap();
        assert_eq!((last.xn, last.yn), (1.0, 1.0));
        assert_eq!(last.index, 8);
    }
}
