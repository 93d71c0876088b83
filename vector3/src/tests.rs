use super::*;

#[test]
fn test_vector3f64_cross_product() {
    let a = Vector3f64::new(1.0, 0.0, 0.0);
    let b = Vector3f64::new(0.0, 1.0, 0.0);
    let c = a.cross_product(&b);

    assert_eq!(c, Vector3f64::new(0.0, 0.0, 1.0));
    assert_eq!(a.dot_product(&c), 0.0);
}

#[test]
fn test_vector3f64_arithmetic() {
    let a = Vector3f64::new(1.0, 2.0, 3.0);
    let b = Vector3f64::new(0.5, -1.0, 2.0);

    assert_eq!(a + b, Vector3f64::new(1.5, 1.0, 5.0));
    assert_eq!(a - b, Vector3f64::new(0.5, 3.0, 1.0));
    assert_eq!(-a, Vector3f64::new(-1.0, -2.0, -3.0));
    assert_eq!(2.0 * a, a * 2.0);
    assert!(((a / 2.0).norm2() - 14.0f64.sqrt() / 2.0).abs() < 1.0E-14);
}

#[test]
fn test_vector3f64_spherical() {
    let (r, theta, phi) = Vector3f64::new(0.0, 2.0, 0.0).to_spherical();
    assert!((r - 2.0).abs() < 1.0E-14);
    assert!((theta - std::f64::consts::FRAC_PI_2).abs() < 1.0E-14);
    assert!((phi - std::f64::consts::FRAC_PI_2).abs() < 1.0E-14);

    assert_eq!(Vector3f64::zeros().to_spherical(), (0.0, 0.0, 0.0));
}

#[test]
fn test_vector3i32_ops() {
    let a = Vector3i32::new(1, -2, 3);
    let b = Vector3i32::new(4, 5, -6);

    assert_eq!(a + b, Vector3i32::new(5, 3, -3));
    assert_eq!(a - b, Vector3i32::new(-3, -7, 9));
    assert!((a + (-a)).is_zero());
    assert_eq!(a.to_f64(), Vector3f64::new(1.0, -2.0, 3.0));
    assert_eq!(a.get(2), 3);
}
