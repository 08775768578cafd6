//! The `pow` kernel and its host-side reference.

/// Entry point of the default binary.
pub const ENTRY_POINT: &str = "entry_point";
/// Entry point of the `clpow-vpow` variant.
pub const VPOW_ENTRY_POINT: &str = "vpow";

const FP64_GUARD: &str = r#"#if defined(cl_khr_fp64)
#  pragma OPENCL EXTENSION cl_khr_fp64: enable
#elif defined(cl_amd_fp64)
#  pragma OPENCL EXTENSION cl_amd_fp64: enable
#else
#  error double precision is not supported
#endif
"#;

/// OpenCL C source computing `c[i] = pow(a[i], b[i])` for `i < n`.
///
/// Arguments, in order: `ulong n`, `global const double *a`,
/// `global const double *b`, `global double *c`.
pub fn pow_kernel_source(entry_point: &str) -> String {
    format!(
        "{FP64_GUARD}kernel
void {entry_point}(ulong n, global const double *a,
        global const double *b, global double *c)
{{
    size_t id = get_global_id(0);
    if (id < n)
       c[id] = pow(a[id], b[id]);
}}
"
    )
}

/// Host reference of the kernel. Writes `min(a.len(), b.len(), out.len())`
/// elements, mirroring the `id < n` guard.
pub fn host_pow(a: &[f64], b: &[f64], out: &mut [f64]) {
    for ((c, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *c = x.powf(y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_names_the_entry_point() {
        let src = pow_kernel_source("vpow");
        assert!(src.contains("void vpow(ulong n, global const double *a,"));
        assert!(!src.contains("entry_point"));
        assert!(pow_kernel_source(ENTRY_POINT).contains("void entry_point("));
    }

    #[test]
    fn source_requires_double_precision() {
        let src = pow_kernel_source(ENTRY_POINT);
        assert!(src.starts_with("#if defined(cl_khr_fp64)"));
        assert!(src.contains("#  pragma OPENCL EXTENSION cl_amd_fp64: enable"));
        assert!(src.contains("#  error double precision is not supported"));
        assert!(src.contains("if (id < n)"));
    }

    #[test]
    fn host_pow_stops_at_shortest_slice() {
        let a = [2.0, 3.0, 4.0];
        let b = [2.0, 2.0];
        let mut out = [-1.0; 3];
        host_pow(&a, &b, &mut out);
        assert_eq!(out, [4.0, 9.0, -1.0]);
    }
}
