use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;
use types::c64;

/// 3-D complex transform on a first-index-fastest box.
///
/// Both directions are unnormalized, the forward one uses exp(-i...).
pub struct DWFFT3D {
    n: [usize; 3],
    plan_fwd: [Arc<dyn Fft<f64>>; 3],
    plan_bwd: [Arc<dyn Fft<f64>>; 3],
}

impl DWFFT3D {
    pub fn new(n1: usize, n2: usize, n3: usize) -> DWFFT3D {
        let mut planner = FftPlanner::<f64>::new();

        let plan_fwd = [
            planner.plan_fft(n1, FftDirection::Forward),
            planner.plan_fft(n2, FftDirection::Forward),
            planner.plan_fft(n3, FftDirection::Forward),
        ];

        let plan_bwd = [
            planner.plan_fft(n1, FftDirection::Inverse),
            planner.plan_fft(n2, FftDirection::Inverse),
            planner.plan_fft(n3, FftDirection::Inverse),
        ];

        DWFFT3D {
            n: [n1, n2, n3],
            plan_fwd,
            plan_bwd,
        }
    }

    pub fn get_size(&self) -> [usize; 3] {
        self.n
    }

    pub fn fft3d(&self, slice_in: &[c64], slice_out: &mut [c64]) {
        slice_out.copy_from_slice(slice_in);
        self.execute(&self.plan_fwd, slice_out);
    }

    pub fn ifft3d(&self, slice_in: &[c64], slice_out: &mut [c64]) {
        slice_out.copy_from_slice(slice_in);
        self.execute(&self.plan_bwd, slice_out);
    }

    fn execute(&self, plans: &[Arc<dyn Fft<f64>>; 3], data: &mut [c64]) {
        let [n1, n2, n3] = self.n;

        assert_eq!(data.len(), n1 * n2 * n3);

        // x: contiguous lines
        plans[0].process(data);

        // y
        let mut line = vec![c64::new(0.0, 0.0); n2];
        for k in 0..n3 {
            for i in 0..n1 {
                let base = i + k * n1 * n2;

                for (j, v) in line.iter_mut().enumerate() {
                    *v = data[base + j * n1];
                }

                plans[1].process(&mut line);

                for (j, v) in line.iter().enumerate() {
                    data[base + j * n1] = *v;
                }
            }
        }

        // z
        let mut line = vec![c64::new(0.0, 0.0); n3];
        let stride = n1 * n2;
        for base in 0..stride {
            for (k, v) in line.iter_mut().enumerate() {
                *v = data[base + k * stride];
            }

            plans[2].process(&mut line);

            for (k, v) in line.iter().enumerate() {
                data[base + k * stride] = *v;
            }
        }
    }
}
