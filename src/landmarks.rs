// src/landmarks.rs
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter};

/// MediaPipe pose topology, in the order the model emits landmarks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    pub const COUNT: usize = 33;

    pub fn from_index(index: usize) -> Option<Self> {
        use PoseLandmark::*;
        const ALL: [PoseLandmark; PoseLandmark::COUNT] = [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye, RightEyeOuter,
            LeftEar, RightEar, MouthLeft, MouthRight, LeftShoulder, RightShoulder, LeftElbow,
            RightElbow, LeftWrist, RightWrist, LeftPinky, RightPinky, LeftIndex, RightIndex,
            LeftThumb, RightThumb, LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle,
            LeftHeel, RightHeel, LeftFootIndex, RightFootIndex,
        ];
        ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Bone connections drawn by the overlay renderer.
pub const SKELETON_CONNECTIONS: [(PoseLandmark, PoseLandmark); 18] = [
    (PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder),
    (PoseLandmark::LeftShoulder, PoseLandmark::LeftElbow),
    (PoseLandmark::LeftElbow, PoseLandmark::LeftWrist),
    (PoseLandmark::RightShoulder, PoseLandmark::RightElbow),
    (PoseLandmark::RightElbow, PoseLandmark::RightWrist),
    (PoseLandmark::LeftShoulder, PoseLandmark::LeftHip),
    (PoseLandmark::RightShoulder, PoseLandmark::RightHip),
    (PoseLandmark::LeftHip, PoseLandmark::RightHip),
    (PoseLandmark::LeftHip, PoseLandmark::LeftKnee),
    (PoseLandmark::LeftKnee, PoseLandmark::LeftAnkle),
    (PoseLandmark::RightHip, PoseLandmark::RightKnee),
    (PoseLandmark::RightKnee, PoseLandmark::RightAnkle),
    (PoseLandmark::LeftAnkle, PoseLandmark::LeftHeel),
    (PoseLandmark::LeftHeel, PoseLandmark::LeftFootIndex),
    (PoseLandmark::LeftAnkle, PoseLandmark::LeftFootIndex),
    (PoseLandmark::RightAnkle, PoseLandmark::RightHeel),
    (PoseLandmark::RightHeel, PoseLandmark::RightFootIndex),
    (PoseLandmark::RightAnkle, PoseLandmark::RightFootIndex),
];

/// A single detected keypoint in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position, 0.0 at the left edge and 1.0 at the right.
    pub x: f64,
    /// Vertical position, 0.0 at the top edge and 1.0 at the bottom.
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }

    /// Position in pixel space for a frame of the given size.
    pub fn to_pixel(&self, width: u32, height: u32) -> Vector2<f64> {
        Vector2::new(self.x * width as f64, self.y * height as f64)
    }
}

/// One frame's detected landmarks. Only exists when detection succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseLandmarks {
    points: HashMap<PoseLandmark, Landmark>,
}

impl PoseLandmarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a landmark set from raw model rows (`[x, y, z]` or
    /// `[x, y, z, visibility]`) in MediaPipe order. Rows past the topology are ignored.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let mut landmarks = Self::new();
        for (idx, row) in rows.iter().enumerate() {
            let Some(name) = PoseLandmark::from_index(idx) else {
                break;
            };
            if row.len() < 2 {
                continue;
            }
            landmarks.insert(
                name,
                Landmark {
                    x: row[0],
                    y: row[1],
                    z: row.get(2).copied().unwrap_or(0.0),
                    visibility: row.get(3).copied().unwrap_or(1.0),
                },
            );
        }
        landmarks
    }

    pub fn insert(&mut self, name: PoseLandmark, landmark: Landmark) {
        self.points.insert(name, landmark);
    }

    pub fn with(mut self, name: PoseLandmark, x: f64, y: f64) -> Self {
        self.insert(name, Landmark::new(x, y));
        self
    }

    pub fn get(&self, name: PoseLandmark) -> Option<&Landmark> {
        self.points.get(&name)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PoseLandmark, &Landmark)> {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_index_round_trip() {
        for name in PoseLandmark::iter() {
            assert_eq!(PoseLandmark::from_index(name.index()), Some(name));
        }
        assert_eq!(PoseLandmark::from_index(PoseLandmark::COUNT), None);
    }

    #[test]
    fn test_from_rows_uses_mediapipe_order() {
        let mut rows = vec![vec![0.0, 0.0, 0.0]; 16];
        rows[11] = vec![0.25, 0.5, 0.1, 0.9];
        rows[15] = vec![0.75, 0.125];

        let pose = PoseLandmarks::from_rows(&rows);
        assert_eq!(pose.len(), 16);

        let shoulder = pose.get(PoseLandmark::LeftShoulder).unwrap();
        assert_eq!((shoulder.x, shoulder.y, shoulder.visibility), (0.25, 0.5, 0.9));

        let wrist = pose.get(PoseLandmark::LeftWrist).unwrap();
        assert_eq!(wrist.visibility, 1.0);
        assert!(pose.get(PoseLandmark::LeftHip).is_none());
    }

    #[test]
    fn test_names_are_snake_case() {
        assert_eq!(PoseLandmark::LeftFootIndex.to_string(), "left_foot_index");
    }
}
