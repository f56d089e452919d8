use time::macros::format_description;
use time::OffsetDateTime;

fn main() {
    // Re-run build script when this file changes
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=ARCHY_BUILD_DATE");

    // Build date (UTC ISO-8601). ARCHY_BUILD_DATE pins it for reproducible builds.
    let build_date = std::env::var("ARCHY_BUILD_DATE")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            let fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
            OffsetDateTime::now_utc()
                .format(&fmt)
                .unwrap_or_else(|_| format!("unix:{}", OffsetDateTime::now_utc().unix_timestamp()))
        });
    println!("cargo:rustc-env=ARCHY_BUILD_DATE={build_date}");

    // Target triple and profile
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=ARCHY_BUILD_TARGET={target}");

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=ARCHY_BUILD_PROFILE={profile}");

    // rustc version (best-effort)
    let rustc_ver = rustc_version::version()
        .map(|v| format!("rustc {v}"))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=ARCHY_BUILD_RUSTC={rustc_ver}");
}
