use crate::{Vector3, Vector3f64};

pub type Vector3i32 = Vector3<i32>;

use std::fmt;
use std::ops::{Add, Neg, Sub};

impl Vector3i32 {
    pub fn to_f64(&self) -> Vector3f64 {
        Vector3f64::new(self.x as f64, self.y as f64, self.z as f64)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0 && self.z == 0
    }
}

impl Add<Vector3i32> for Vector3i32 {
    type Output = Vector3i32;

    fn add(self, rhs: Vector3i32) -> Vector3i32 {
        Vector3i32::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub<Vector3i32> for Vector3i32 {
    type Output = Vector3i32;

    fn sub(self, rhs: Vector3i32) -> Vector3i32 {
        Vector3i32::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3i32 {
    type Output = Vector3i32;

    fn neg(self) -> Vector3i32 {
        Vector3i32::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Vector3i32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}
