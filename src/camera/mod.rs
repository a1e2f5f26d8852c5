/// Projection and view matrices, OpenGL conventions.
///
/// View space has the camera at the origin looking down -Z with +Y up.
/// The builders reproduce `glFrustum`, `glOrtho`, `gluPerspective` and
/// `gluLookAt`; matrices are column-major like glam's.
use glam::{Mat4, Vec3};

/// `glFrustum`.
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let mut m = [0.0f32; 16];
    m[0] = 2.0 * near / (right - left);
    m[5] = 2.0 * near / (top - bottom);
    m[8] = (right + left) / (right - left);
    m[9] = (top + bottom) / (top - bottom);
    m[10] = (far + near) / (near - far);
    m[11] = -1.0;
    m[14] = 2.0 * far * near / (near - far);
    Mat4::from_cols_array(&m)
}

/// `glOrtho`.
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let mut m = [0.0f32; 16];
    m[0] = 2.0 / (right - left);
    m[5] = 2.0 / (top - bottom);
    m[10] = -2.0 / (far - near);
    m[12] = (right + left) / (left - right);
    m[13] = (top + bottom) / (bottom - top);
    m[14] = (far + near) / (near - far);
    m[15] = 1.0;
    Mat4::from_cols_array(&m)
}

/// `gluPerspective`, `fovy` in degrees.
pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let aux = (fovy.to_radians() / 2.0).tan();
    let top = near * aux;
    let right = near * aspect * aux;
    frustum(-right, right, -top, top, near, far)
}

/// `gluLookAt`, with the up vector made orthogonal to the view direction
/// first so the result stays a rigid transform when looking up or down.
pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
    let f = (center - eye).normalize_or_zero();
    let up = up.normalize_or_zero();
    let up = (up - up.dot(f) * f).normalize_or_zero();
    let s = f.cross(up);
    let u = s.cross(f);
    Mat4::from_cols_array(&[
        s.x,
        u.x,
        -f.x,
        0.0,
        s.y,
        u.y,
        -f.y,
        0.0,
        s.z,
        u.z,
        -f.z,
        0.0,
        -s.dot(eye),
        -u.dot(eye),
        f.dot(eye),
        1.0,
    ])
}

/// `glRotate`: `angle` in degrees about `axis`. Identity for a zero axis.
pub fn rotation(angle: f32, axis: Vec3) -> Mat4 {
    match axis.try_normalize() {
        Some(n) => Mat4::from_axis_angle(n, angle.to_radians()),
        None => Mat4::IDENTITY,
    }
}

/// Negate the second row so that NDC +Y maps to image row 0 growing
/// downwards. Applying it twice gives back the input.
pub fn invert_y_axis(m: Mat4) -> Mat4 {
    let mut c = m.to_cols_array();
    for col in 0..4 {
        c[col * 4 + 1] = -c[col * 4 + 1];
    }
    Mat4::from_cols_array(&c)
}

/// Axis-aligned box. The all-zero box stands for "unknown".
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Box3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Box3 {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Box3 { min, max }
    }

    /// Smallest box holding every point; the unset box when empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut it = points.into_iter();
        let Some(first) = it.next() else {
            return Box3::default();
        };
        it.fold(Box3::new(*first, *first), |b, p| Box3::new(b.min.min(*p), b.max.max(*p)))
    }

    pub fn is_unset(&self) -> bool {
        self.min == Vec3::ZERO && self.max == Vec3::ZERO
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

/// Camera orbiting a target, driven by mouse drags and the wheel.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,   // around Y (radians)
    pub pitch: f32, // around X (radians)
    pub mouse_sensitivity: f32,
}

impl OrbitCamera {
    pub fn new(target: Vec3, distance: f32) -> Self {
        Self {
            target,
            distance,
            yaw: 0.0,
            pitch: 0.0,
            mouse_sensitivity: 0.01,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + self.distance * Vec3::new(sy * cp, sp, cy * cp)
    }

    pub fn view_matrix(&self) -> Mat4 {
        look_at(self.eye(), self.target, Vec3::Y)
    }

    pub fn rotate(&mut self, mouse_delta_x: f32, mouse_delta_y: f32) {
        self.yaw -= mouse_delta_x * self.mouse_sensitivity;
        self.pitch += mouse_delta_y * self.mouse_sensitivity;

        // Keep away from the poles: look_at degenerates there.
        const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;
        self.pitch = self.pitch.clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn zoom(&mut self, steps: f32) {
        self.distance = (self.distance * 0.9f32.powf(steps)).clamp(1.5, 100.0);
    }
}
