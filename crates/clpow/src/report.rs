//! Platform and device property dump.
//!
//! Every query is optional: a failed `clGet*Info` shows up as `n/a` instead
//! of aborting the run.

use std::fmt::{self, Debug, Display};

use opencl3::device::Device;
use opencl3::platform::Platform;

const NA: &str = "n/a";

// ─── Bitfield / enum names (values from cl.h) ─────────────────────────

const DEVICE_TYPES: &[(u64, &str)] = &[
    (1 << 0, "DEFAULT"),
    (1 << 1, "CPU"),
    (1 << 2, "GPU"),
    (1 << 3, "ACCELERATOR"),
    (1 << 4, "CUSTOM"),
];

const EXEC_CAPABILITIES: &[(u64, &str)] = &[(1 << 0, "KERNEL"), (1 << 1, "NATIVE_KERNEL")];

const QUEUE_PROPERTIES: &[(u64, &str)] = &[
    (1 << 0, "OUT_OF_ORDER_EXEC_MODE_ENABLE"),
    (1 << 1, "PROFILING_ENABLE"),
];

const FP_CONFIG: &[(u64, &str)] = &[
    (1 << 0, "DENORM"),
    (1 << 1, "INF_NAN"),
    (1 << 2, "ROUND_TO_NEAREST"),
    (1 << 3, "ROUND_TO_ZERO"),
    (1 << 4, "ROUND_TO_INF"),
    (1 << 5, "FMA"),
    (1 << 6, "SOFT_FLOAT"),
    (1 << 7, "CORRECTLY_ROUNDED_DIVIDE_SQRT"),
];

const AFFINITY_DOMAINS: &[(u64, &str)] = &[
    (1 << 0, "NUMA"),
    (1 << 1, "L4_CACHE"),
    (1 << 2, "L3_CACHE"),
    (1 << 3, "L2_CACHE"),
    (1 << 4, "L1_CACHE"),
    (1 << 5, "NEXT_PARTITIONABLE"),
];

/// Names of the bits set in `value`, joined with `|`. Unknown bits are
/// appended in hex; an empty bitfield is `NONE`.
pub fn flag_names(value: u64, table: &[(u64, &str)]) -> String {
    let mut names: Vec<String> = Vec::new();
    let mut rest = value;
    for &(bit, name) in table {
        if value & bit != 0 {
            names.push(name.to_owned());
            rest &= !bit;
        }
    }
    if rest != 0 {
        names.push(format!("{rest:#x}"));
    }
    if names.is_empty() {
        return "NONE".to_owned();
    }
    names.join("|")
}

pub fn device_type_name(value: u64) -> String {
    flag_names(value, DEVICE_TYPES)
}

pub fn exec_capabilities_name(value: u64) -> String {
    flag_names(value, EXEC_CAPABILITIES)
}

pub fn queue_properties_name(value: u64) -> String {
    flag_names(value, QUEUE_PROPERTIES)
}

pub fn fp_config_name(value: u64) -> String {
    flag_names(value, FP_CONFIG)
}

pub fn affinity_domain_name(value: u64) -> String {
    flag_names(value, AFFINITY_DOMAINS)
}

pub fn local_mem_type_name(value: u64) -> &'static str {
    match value {
        1 => "LOCAL",
        2 => "GLOBAL",
        _ => "NONE",
    }
}

pub fn cache_type_name(value: u64) -> &'static str {
    match value {
        0 => "NONE",
        1 => "READ_ONLY_CACHE",
        2 => "READ_WRITE_CACHE",
        _ => "UNKNOWN",
    }
}

/// Raw `cl_platform_id` / `cl_device_id` handle; a null handle is `NULL`.
pub fn handle_name(value: u64) -> String {
    if value == 0 {
        return "NULL".to_owned();
    }
    format!("{value:#x}")
}

pub fn partition_property_name(value: u64) -> String {
    match value {
        0x1086 => "EQUALLY".to_owned(),
        0x1087 => "BY_COUNTS".to_owned(),
        0x1088 => "BY_AFFINITY_DOMAIN".to_owned(),
        other => format!("{other:#x}"),
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────

struct Opt<'a, T>(&'a Option<T>);

impl<T: Display> Display for Opt<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str(NA),
        }
    }
}

struct YesNo(Option<bool>);

impl Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.0 {
            Some(true) => "YES",
            Some(false) => "NO",
            None => NA,
        })
    }
}

fn named(value: Option<u64>, name: impl Fn(u64) -> String) -> Option<String> {
    value.map(name)
}

fn list<T: Display>(items: &Option<Vec<T>>) -> String {
    match items {
        Some(items) if items.is_empty() => "NONE".to_owned(),
        Some(items) => items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
        None => NA.to_owned(),
    }
}

const VECTOR_KINDS: [&str; 7] = ["CHAR", "SHORT", "INT", "LONG", "FLOAT", "DOUBLE", "HALF"];

fn vector_widths(f: &mut fmt::Formatter<'_>, title: &str, widths: &[Option<u64>; 7]) -> fmt::Result {
    writeln!(f, "= {title} =")?;
    let line: Vec<String> = VECTOR_KINDS
        .iter()
        .zip(widths)
        .map(|(kind, width)| format!("{kind}: {}", Opt(width)))
        .collect();
    writeln!(f, "{}", line.join(" | "))
}

fn debug_of<T: Debug, E>(res: Result<T, E>) -> Option<String> {
    res.ok().map(|v| format!("{v:?}"))
}

// ─── Platform ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformReport {
    pub profile: Option<String>,
    pub version: Option<String>,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub extensions: Option<String>,
}

impl PlatformReport {
    pub fn query(platform: &Platform) -> Self {
        Self {
            profile: platform.profile().ok(),
            version: platform.version().ok(),
            name: platform.name().ok(),
            vendor: platform.vendor().ok(),
            extensions: platform.extensions().ok(),
        }
    }
}

impl Display for PlatformReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "=====================================")?;
        writeln!(f, "========== PLATFORM INFO ============")?;
        let fields = [
            ("PROFILE", &self.profile),
            ("VERSION", &self.version),
            ("NAME", &self.name),
            ("VENDOR", &self.vendor),
            ("EXTENSIONS", &self.extensions),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                writeln!(f, "{label}: {value}")?;
            }
        }
        write!(f, "=====================================")
    }
}

// ─── Device ───────────────────────────────────────────────────────────

/// Snapshot of the device properties printed before selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceReport {
    pub device_type: Option<u64>,
    pub vendor_id: Option<u64>,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub driver_version: Option<String>,
    pub profile: Option<String>,
    pub version: Option<String>,
    pub platform: Option<u64>,
    pub available: Option<bool>,
    pub compiler_available: Option<bool>,
    pub opencl_c_version: Option<String>,
    pub parent_device: Option<u64>,
    pub address_bits: Option<u64>,
    pub mem_base_addr_align: Option<u64>,
    pub min_data_type_align_size: Option<u64>,
    pub max_constant_buffer_size: Option<u64>,
    pub error_correction_support: Option<bool>,
    pub profiling_timer_resolution: Option<u64>,
    pub endian_little: Option<bool>,
    pub execution_capabilities: Option<u64>,
    pub queue_properties: Option<u64>,
    pub host_unified_memory: Option<bool>,
    pub built_in_kernels: Option<String>,
    pub reference_count: Option<u64>,
    pub extensions: Option<String>,
    /// char, short, int, long, float, double, half
    pub native_vector_widths: [Option<u64>; 7],
    /// Same order as `native_vector_widths`.
    pub preferred_vector_widths: [Option<u64>; 7],
    pub preferred_interop_user_sync: Option<bool>,
    pub max_work_item_dimensions: Option<u64>,
    pub max_work_group_size: Option<u64>,
    pub max_work_item_sizes: Option<Vec<u64>>,
    pub max_compute_units: Option<u64>,
    pub max_clock_frequency: Option<u64>,
    pub max_read_image_args: Option<u64>,
    pub max_write_image_args: Option<u64>,
    pub max_mem_alloc_size: Option<u64>,
    pub max_parameter_size: Option<u64>,
    pub max_samplers: Option<u64>,
    pub max_constant_args: Option<u64>,
    pub image_support: Option<bool>,
    pub image2d_max: [Option<u64>; 2],
    pub image3d_max: [Option<u64>; 3],
    pub local_mem_type: Option<u64>,
    pub local_mem_size: Option<u64>,
    pub global_mem_cache_type: Option<u64>,
    pub global_mem_cacheline_size: Option<u64>,
    pub global_mem_cache_size: Option<u64>,
    pub global_mem_size: Option<u64>,
    pub single_fp_config: Option<u64>,
    pub double_fp_config: Option<u64>,
    pub partition_affinity_domain: Option<String>,
    pub partition_properties: Option<Vec<u64>>,
    pub partition_type: Option<String>,
}

macro_rules! num {
    ($call:expr) => {
        $call.ok().map(|v| v as u64)
    };
}

impl DeviceReport {
    pub fn query(dev: &Device) -> Self {
        Self {
            device_type: num!(dev.dev_type()),
            vendor_id: num!(dev.vendor_id()),
            name: dev.name().ok(),
            vendor: dev.vendor().ok(),
            driver_version: dev.driver_version().ok(),
            profile: dev.profile().ok(),
            version: dev.version().ok(),
            platform: num!(dev.platform()),
            available: dev.available().ok(),
            compiler_available: dev.compiler_available().ok(),
            opencl_c_version: dev.opencl_c_version().ok(),
            parent_device: num!(dev.parent_device()),
            address_bits: num!(dev.address_bits()),
            mem_base_addr_align: num!(dev.mem_base_addr_align()),
            min_data_type_align_size: num!(dev.min_data_type_align_size()),
            max_constant_buffer_size: num!(dev.max_constant_buffer_size()),
            error_correction_support: dev.error_correction_support().ok(),
            profiling_timer_resolution: num!(dev.profiling_timer_resolution()),
            endian_little: dev.endian_little().ok(),
            execution_capabilities: num!(dev.execution_capabilities()),
            queue_properties: num!(dev.queue_on_host_properties()),
            host_unified_memory: dev.host_unified_memory().ok(),
            built_in_kernels: dev.built_in_kernels().ok(),
            reference_count: num!(dev.reference_count()),
            extensions: dev.extensions().ok(),
            native_vector_widths: [
                num!(dev.native_vector_width_char()),
                num!(dev.native_vector_width_short()),
                num!(dev.native_vector_width_int()),
                num!(dev.native_vector_width_long()),
                num!(dev.native_vector_width_float()),
                num!(dev.native_vector_width_double()),
                num!(dev.native_vector_width_half()),
            ],
            preferred_vector_widths: [
                num!(dev.preferred_vector_width_char()),
                num!(dev.preferred_vector_width_short()),
                num!(dev.preferred_vector_width_int()),
                num!(dev.preferred_vector_width_long()),
                num!(dev.preferred_vector_width_float()),
                num!(dev.preferred_vector_width_double()),
                num!(dev.preferred_vector_width_half()),
            ],
            preferred_interop_user_sync: dev.preferred_interop_user_sync().ok(),
            max_work_item_dimensions: num!(dev.max_work_item_dimensions()),
            max_work_group_size: num!(dev.max_work_group_size()),
            max_work_item_sizes: dev
                .max_work_item_sizes()
                .ok()
                .map(|sizes| sizes.into_iter().map(|s| s as u64).collect()),
            max_compute_units: num!(dev.max_compute_units()),
            max_clock_frequency: num!(dev.max_clock_frequency()),
            max_read_image_args: num!(dev.max_read_image_args()),
            max_write_image_args: num!(dev.max_write_image_args()),
            max_mem_alloc_size: num!(dev.max_mem_alloc_size()),
            max_parameter_size: num!(dev.max_parameter_size()),
            max_samplers: num!(dev.max_samplers()),
            max_constant_args: num!(dev.max_constant_args()),
            image_support: dev.image_support().ok(),
            image2d_max: [
                num!(dev.image2d_max_width()),
                num!(dev.image2d_max_height()),
            ],
            image3d_max: [
                num!(dev.image3d_max_width()),
                num!(dev.image3d_max_height()),
                num!(dev.image3d_max_depth()),
            ],
            local_mem_type: num!(dev.local_mem_type()),
            local_mem_size: num!(dev.local_mem_size()),
            global_mem_cache_type: num!(dev.global_mem_cache_type()),
            global_mem_cacheline_size: num!(dev.global_mem_cacheline_size()),
            global_mem_cache_size: num!(dev.global_mem_cache_size()),
            global_mem_size: num!(dev.global_mem_size()),
            single_fp_config: num!(dev.single_fp_config()),
            double_fp_config: num!(dev.double_fp_config()),
            partition_affinity_domain: debug_of(dev.partition_affinity_domain()),
            partition_properties: dev
                .partition_properties()
                .ok()
                .map(|props| props.into_iter().map(|p| p as u64).collect()),
            partition_type: debug_of(dev.partition_type()),
        }
    }
}

impl Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "+++++++++++++++++++++++++++++++++++++")?;
        writeln!(f, "+++++++++++ DEVICE INFO +++++++++++++")?;
        write!(f, "TYPE: {}", Opt(&named(self.device_type, device_type_name)))?;
        write!(f, " | VENDOR_ID: {}", Opt(&self.vendor_id))?;
        write!(f, " | NAME: {}", Opt(&self.name))?;
        write!(f, " | VENDOR: {}", Opt(&self.vendor))?;
        write!(f, " | DRIVER_VERSION: {}", Opt(&self.driver_version))?;
        write!(f, " | PROFILE: {}", Opt(&self.profile))?;
        write!(f, " | VERSION: {}", Opt(&self.version))?;
        write!(f, " | PLATFORM: {}", Opt(&named(self.platform, handle_name)))?;
        write!(f, " | AVAILABLE: {}", YesNo(self.available))?;
        write!(f, " | COMPILER_AVAILABLE: {}", YesNo(self.compiler_available))?;
        write!(f, " | OPENCL_C_VERSION: {}", Opt(&self.opencl_c_version))?;
        write!(f, " | PARENT_DEVICE: {}", Opt(&named(self.parent_device, handle_name)))?;
        write!(f, " | ADDRESS_BITS: {}", Opt(&self.address_bits))?;
        write!(f, " | MEM_BASE_ADDR_ALIGN: {}", Opt(&self.mem_base_addr_align))?;
        write!(f, " | MIN_DATA_TYPE_ALIGN_SIZE: {}", Opt(&self.min_data_type_align_size))?;
        write!(f, " | CONSTANT_BUFFER_SIZE: {}", Opt(&self.max_constant_buffer_size))?;
        write!(f, " | ERROR_CORRECTION_SUPPORT: {}", YesNo(self.error_correction_support))?;
        write!(f, " | PROFILING_TIMER_RESOLUTION: {}", Opt(&self.profiling_timer_resolution))?;
        write!(f, " | ENDIAN_LITTLE: {}", YesNo(self.endian_little))?;
        write!(
            f,
            " | EXECUTION_CAPABILITIES: {}",
            Opt(&named(self.execution_capabilities, exec_capabilities_name))
        )?;
        write!(
            f,
            " | QUEUE_PROPERTIES: {}",
            Opt(&named(self.queue_properties, queue_properties_name))
        )?;
        write!(f, " | HOST_UNIFIED_MEMORY: {}", YesNo(self.host_unified_memory))?;
        write!(f, " | BUILT_IN_KERNELS: {}", Opt(&self.built_in_kernels))?;
        writeln!(f, " | REFERENCE_COUNT: {}", Opt(&self.reference_count))?;

        writeln!(f, "= EXTENSIONS =")?;
        writeln!(f, "{}", Opt(&self.extensions))?;

        vector_widths(f, "NATIVE_VECTOR_WIDTH", &self.native_vector_widths)?;
        vector_widths(f, "PREFERRED_VECTOR_WIDTH", &self.preferred_vector_widths)?;
        writeln!(
            f,
            "PREFERRED_INTEROP_USER_SYNC: {}",
            YesNo(self.preferred_interop_user_sync)
        )?;

        writeln!(f, "= MAX_WORK =")?;
        write!(f, "ITEM_DIMENSIONS: {}", Opt(&self.max_work_item_dimensions))?;
        write!(f, " | GROUP_SIZE: {}", Opt(&self.max_work_group_size))?;
        writeln!(f, " | ITEM_SIZES: {}", list(&self.max_work_item_sizes))?;

        writeln!(f, "= MAX =")?;
        write!(f, "COMPUTE_UNITS: {}", Opt(&self.max_compute_units))?;
        write!(f, " | CLOCK_FREQUENCY: {}", Opt(&self.max_clock_frequency))?;
        write!(f, " | READ_IMAGE_ARGS: {}", Opt(&self.max_read_image_args))?;
        write!(f, " | WRITE_IMAGE_ARGS: {}", Opt(&self.max_write_image_args))?;
        write!(f, " | MEM_ALLOC_SIZE: {}", Opt(&self.max_mem_alloc_size))?;
        write!(f, " | PARAMETER_SIZE: {}", Opt(&self.max_parameter_size))?;
        write!(f, " | SAMPLERS: {}", Opt(&self.max_samplers))?;
        writeln!(f, " | CONSTANT_ARGS: {}", Opt(&self.max_constant_args))?;

        writeln!(f, "= IMAGE =")?;
        write!(f, "SUPPORT: {}", YesNo(self.image_support))?;
        write!(f, " | 2D_MAX_WIDTH: {}", Opt(&self.image2d_max[0]))?;
        write!(f, " | 2D_MAX_HEIGHT: {}", Opt(&self.image2d_max[1]))?;
        write!(f, " | 3D_MAX_WIDTH: {}", Opt(&self.image3d_max[0]))?;
        write!(f, " | 3D_MAX_HEIGHT: {}", Opt(&self.image3d_max[1]))?;
        writeln!(f, " | 3D_MAX_DEPTH: {}", Opt(&self.image3d_max[2]))?;

        writeln!(f, "= LOCAL_MEM =")?;
        write!(
            f,
            "TYPE: {}",
            Opt(&self.local_mem_type.map(local_mem_type_name))
        )?;
        writeln!(f, " | SIZE: {}", Opt(&self.local_mem_size))?;

        writeln!(f, "= GLOBAL_MEM =")?;
        write!(
            f,
            "CACHE_TYPE: {}",
            Opt(&self.global_mem_cache_type.map(cache_type_name))
        )?;
        write!(f, " | CACHELINE_SIZE: {}", Opt(&self.global_mem_cacheline_size))?;
        write!(f, " | CACHE_SIZE: {}", Opt(&self.global_mem_cache_size))?;
        writeln!(f, " | SIZE: {}", Opt(&self.global_mem_size))?;

        writeln!(f, "= FP_CONFIG =")?;
        write!(f, "SINGLE: {}", Opt(&named(self.single_fp_config, fp_config_name)))?;
        writeln!(f, " | DOUBLE: {}", Opt(&named(self.double_fp_config, fp_config_name)))?;

        writeln!(f, "= PARTITION =")?;
        write!(f, "AFFINITY_DOMAIN: {}", Opt(&self.partition_affinity_domain))?;
        let props = self.partition_properties.as_ref().map(|props| {
            props
                .iter()
                .map(|&p| partition_property_name(p))
                .collect::<Vec<_>>()
        });
        write!(f, " | PROPERTIES: {}", list(&props))?;
        writeln!(f, " | TYPE: {}", Opt(&self.partition_type))?;
        write!(f, "+++++++++++++++++++++++++++++++++++++")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_joined_in_table_order() {
        assert_eq!(device_type_name(1 << 2), "GPU");
        assert_eq!(device_type_name((1 << 2) | (1 << 0)), "DEFAULT|GPU");
        assert_eq!(fp_config_name(0b10_0111), "DENORM|INF_NAN|ROUND_TO_NEAREST|FMA");
        assert_eq!(queue_properties_name(0), "NONE");
    }

    #[test]
    fn unknown_bits_are_kept_in_hex() {
        assert_eq!(exec_capabilities_name(0b101), "KERNEL|0x4");
        assert_eq!(affinity_domain_name(1 << 10), "0x400");
    }

    #[test]
    fn enum_names() {
        assert_eq!(local_mem_type_name(1), "LOCAL");
        assert_eq!(local_mem_type_name(2), "GLOBAL");
        assert_eq!(cache_type_name(2), "READ_WRITE_CACHE");
        assert_eq!(partition_property_name(0x1087), "BY_COUNTS");
        assert_eq!(partition_property_name(7), "0x7");
        assert_eq!(handle_name(0), "NULL");
        assert_eq!(handle_name(0x5555_0000), "0x55550000");
    }

    #[test]
    fn platform_dump_omits_failed_queries() {
        let report = PlatformReport {
            version: Some("OpenCL 1.2 pocl".into()),
            name: Some("Portable Computing Language".into()),
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.contains("VERSION: OpenCL 1.2 pocl\n"));
        assert!(text.contains("NAME: Portable Computing Language\n"));
        assert!(!text.contains("PROFILE:"));
        assert!(text.contains("========== PLATFORM INFO ============"));
    }

    #[test]
    fn device_dump_marks_missing_values() {
        let report = DeviceReport {
            device_type: Some(1 << 2),
            name: Some("Radeon".into()),
            available: Some(true),
            max_work_item_sizes: Some(vec![1024, 1024, 64]),
            partition_properties: Some(vec![]),
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.contains("TYPE: GPU | VENDOR_ID: n/a | NAME: Radeon"));
        assert!(text.contains("AVAILABLE: YES | COMPILER_AVAILABLE: n/a"));
        assert!(text.contains("ITEM_SIZES: 1024, 1024, 64"));
        assert!(text.contains("PROPERTIES: NONE"));
        assert!(text.ends_with("+++++++++++++++++++++++++++++++++++++"));
    }

    #[test]
    fn device_dump_lists_platform_parent_and_preferred_widths() {
        let report = DeviceReport {
            version: Some("OpenCL 1.2".into()),
            platform: Some(0x1f00),
            parent_device: Some(0),
            opencl_c_version: Some("OpenCL C 1.2".into()),
            native_vector_widths: [Some(4), Some(2), Some(1), Some(1), Some(1), Some(1), None],
            preferred_vector_widths: [Some(16), Some(8), Some(4), Some(2), Some(4), Some(2), Some(0)],
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.contains(" | VERSION: OpenCL 1.2 | PLATFORM: 0x1f00 | AVAILABLE: n/a"));
        assert!(text.contains("OPENCL_C_VERSION: OpenCL C 1.2 | PARENT_DEVICE: NULL | ADDRESS_BITS"));

        let native = text.find("= NATIVE_VECTOR_WIDTH =\nCHAR: 4 | SHORT: 2").unwrap();
        let preferred = text
            .find("= PREFERRED_VECTOR_WIDTH =\nCHAR: 16 | SHORT: 8 | INT: 4 | LONG: 2 | FLOAT: 4 | DOUBLE: 2 | HALF: 0\n")
            .unwrap();
        assert!(native < preferred);
        assert!(text.contains("HALF: n/a\n= PREFERRED_VECTOR_WIDTH ="));
    }
}
