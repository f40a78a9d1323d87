use std::env;
use std::path::PathBuf;

fn main() {
    let proto_file = "proto/adapter.proto";
    println!("cargo:rerun-if-changed={proto_file}");
    println!("cargo:rerun-if-env-changed=PROTOC");

    if env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path()
            .expect("no PROTOC set and no vendored protoc for this host");
        env::set_var("PROTOC", protoc);
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("adapter_descriptor.bin"))
        .compile_protos(&[proto_file], &["proto"])
        .expect("adapter proto compilation must succeed");
}
