// Reference matmul kernel.
//
// Loop order is i-p-j so the inner loop walks both `b` and `c` contiguously.

pub fn naive(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut c = vec![0.0f64; m * n];
    for i in 0..m {
        for p in 0..k {
            let a_ip = a[i * k + p];
            for j in 0..n {
                c[i * n + j] += a_ip * b[p * n + j];
            }
        }
    }
    c
}

/// Integer variant of [`naive`]. Overflow wraps like elementwise `mul`.
pub fn naive_i64(a: &[i64], b: &[i64], m: usize, k: usize, n: usize) -> Vec<i64> {
    let mut c = vec![0i64; m * n];
    for i in 0..m {
        for p in 0..k {
            let a_ip = a[i * k + p];
            for j in 0..n {
                c[i * n + j] = c[i * n + j].wrapping_add(a_ip.wrapping_mul(b[p * n + j]));
            }
        }
    }
    c
}
