/// One camera pose from the movement trace.
///
/// `angle` (yaw) and `elevation` (pitch) are in degrees. `frame_id` is
/// assigned by enumeration order while loading the trace, never parsed
/// from it. `duration_ms` is carried for trace fidelity but does not
/// influence PTS or pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementSample {
    pub frame_id: i32,
    pub t_ms: i64,
    pub duration_ms: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub angle: f32,
    pub elevation: f32,
    pub width: i32,
    pub height: i32,
}

impl Default for MovementSample {
    fn default() -> Self {
        Self {
            frame_id: 0,
            t_ms: 0,
            duration_ms: 16,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            angle: 0.0,
            elevation: 0.0,
            width: 800,
            height: 600,
        }
    }
}
