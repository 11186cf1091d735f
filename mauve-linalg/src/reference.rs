/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! A naive triple-loop GEMM used to cross-check the optimized implementation in tests.

use super::common::Transpose;

#[allow(clippy::too_many_arguments)]
pub(crate) fn sgemm_reference(
    atranspose: Transpose,
    btranspose: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    a: &[f32],
    b: &[f32],
    beta: Option<f32>,
    c: &mut [f32],
) {
    let beta: f32 = beta.unwrap_or(0.0);

    for i in 0..m {
        for j in 0..n {
            let mut temp = 0.0;
            for l in 0..k {
                let a_val = match atranspose {
                    Transpose::None => a[(i * k) + l],
                    Transpose::Ordinary => a[(l * m) + i],
                };
                let b_val = match btranspose {
                    Transpose::None => b[(n * l) + j],
                    Transpose::Ordinary => b[(j * k) + l],
                };
                temp += a_val * b_val;
            }
            c[i * n + j] = alpha * temp + beta * c[i * n + j];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_product() {
        // [1 2]   [5 6]   [19 22]
        // [3 4] x [7 8] = [43 50]
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        let mut c = [1.0; 4];

        sgemm_reference(
            Transpose::None,
            Transpose::None,
            2,
            2,
            2,
            1.0,
            &a,
            &b,
            None,
            &mut c,
        );
        assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);

        // `a' * b` with accumulation.
        let mut c = [1.0; 4];
        sgemm_reference(
            Transpose::Ordinary,
            Transpose::None,
            2,
            2,
            2,
            1.0,
            &a,
            &b,
            Some(1.0),
            &mut c,
        );
        assert_eq!(c, [27.0, 31.0, 39.0, 45.0]);
    }
}
