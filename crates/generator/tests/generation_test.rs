//! Integration test for artifact generation

use prost::Message;
use prost_types::{field_descriptor_proto, FieldDescriptorProto};
use rpcgen_common::{ArtifactKind, GeneratorError, OutputFile, TargetLanguage};
use rpcgen_generator::{
    FileNames, GeneratorOptions, LanguageProfile, Normalize, OutputDirs, RpcGenerator,
};
use rpcgen_parser::protobuf::raw::{self, DescriptorProto};
use rpcgen_parser::wire::{encode_tag, encode_varint, WireType};
use rpcgen_parser::{parse_request, DescriptorGraph, ExampleValues};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn field(name: &str, number: i32, ty: field_descriptor_proto::Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(field_descriptor_proto::Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn extension(name: &str, number: i32, repeated: bool) -> FieldDescriptorProto {
    let label = if repeated {
        field_descriptor_proto::Label::Repeated
    } else {
        field_descriptor_proto::Label::Optional
    };
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(field_descriptor_proto::Type::String as i32),
        extendee: Some(".google.protobuf.MethodOptions".to_string()),
        ..Default::default()
    }
}

fn version_extension(name: &str, number: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(field_descriptor_proto::Label::Optional as i32),
        r#type: Some(field_descriptor_proto::Type::Uint32 as i32),
        extendee: Some(".google.protobuf.FileOptions".to_string()),
        ..Default::default()
    }
}

/// File options with the API version and, optionally,
/// `cc_generic_services = true`
fn file_options(major: Option<u64>, minor: Option<u64>, generic_services: bool) -> Vec<u8> {
    let mut out = Vec::new();
    if generic_services {
        out.extend(encode_tag(16, WireType::Varint));
        encode_varint(1, &mut out);
    }
    for (number, value) in [(50003, major), (50004, minor)] {
        if let Some(value) = value {
            out.extend(encode_tag(number, WireType::Varint));
            encode_varint(value, &mut out);
        }
    }
    out
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn response_options(responses: &[(u32, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (number, type_name) in responses {
        out.extend(encode_tag(*number, WireType::LengthDelimited));
        encode_varint(type_name.len() as u64, &mut out);
        out.extend_from_slice(type_name.as_bytes());
    }
    out
}

fn method(name: &str, responses: &[(u32, &str)]) -> raw::MethodDescriptorProto {
    raw::MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(format!(".payments.{}Args", name)),
        output_type: Some(format!(".payments.{}Completed", name)),
        options: Some(response_options(responses)),
        ..Default::default()
    }
}

/// Payment service with Charge and Refund methods
fn create_payment_request(refund_completion: bool) -> raw::CodeGeneratorRequest {
    use field_descriptor_proto::Type;

    let common = raw::FileDescriptorProto {
        name: Some("api_common.proto".to_string()),
        package: Some("api.common".to_string()),
        extension: vec![
            extension("update_response", 50001, true),
            extension("completion_response", 50002, false),
            version_extension("api_major_version", 50003),
            version_extension("api_minor_version", 50004),
        ],
        ..Default::default()
    };

    let refund_responses: &[(u32, &str)] = if refund_completion {
        &[(50002, ".payments.RefundCompleted")]
    } else {
        &[]
    };

    let payment = raw::FileDescriptorProto {
        name: Some("payment.proto".to_string()),
        package: Some("payments".to_string()),
        dependency: vec!["api_common.proto".to_string()],
        options: Some(file_options(Some(1), Some(0), false)),
        message_type: vec![
            message(
                "ChargeArgs",
                vec![field("amount", 1, Type::Int64), field("currency", 2, Type::String)],
            ),
            message("ChargeProgress", vec![]),
            message("ChargeCompleted", vec![]),
            message("RefundArgs", vec![field("charge_id", 1, Type::String)]),
            message("RefundCompleted", vec![]),
        ],
        service: vec![raw::ServiceDescriptorProto {
            name: Some("Payment".to_string()),
            method: vec![
                method(
                    "Charge",
                    &[
                        (50001, ".payments.ChargeProgress"),
                        (50002, ".payments.ChargeCompleted"),
                    ],
                ),
                method("Refund", refund_responses),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    raw::CodeGeneratorRequest {
        file_to_generate: vec!["payment.proto".to_string()],
        parameter: None,
        proto_file: vec![common, payment],
    }
}

fn payment_graph() -> DescriptorGraph {
    parse_request(&create_payment_request(true).encode_to_vec()).unwrap()
}

fn payment_graph_with_options(file_options: Vec<u8>) -> DescriptorGraph {
    let mut request = create_payment_request(true);
    request.proto_file[1].options = Some(file_options);
    parse_request(&request.encode_to_vec()).unwrap()
}

fn example_values() -> ExampleValues {
    ExampleValues::from_json_str(r#"{"amount": 1500, "currency": "USD", "charge_id": "ch_1"}"#)
        .unwrap()
}

fn options(language: TargetLanguage) -> GeneratorOptions {
    GeneratorOptions {
        examples: example_values(),
        ..GeneratorOptions::for_language(language)
    }
}

fn template_dir(templates: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in templates {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn custom_options(dir: &Path, file_names: FileNames) -> GeneratorOptions {
    let mut options = options(TargetLanguage::NodeJs);
    options.templates_dir = Some(dir.to_path_buf());
    options.profile.file_names = file_names;
    options
}

fn find<'a>(files: &'a [OutputFile], name: &str) -> &'a OutputFile {
    files
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no file named {}", name))
}

fn names(files: &[OutputFile]) -> Vec<&str> {
    files.iter().map(|f| f.name.as_str()).collect()
}

#[test]
fn test_api_file_without_simulator() {
    let dir = template_dir(&[(
        "nodejs.api.source.tera",
        "// {{ service.name }} from {{ file.name }}\n{% for m in service.methods %}{{ m.name | lowercase_first_letter }}\n{% endfor %}",
    )]);
    let file_names = FileNames {
        api_source: Some("{name_lower}.js".to_string()),
        ..Default::default()
    };

    let generator = RpcGenerator::new(payment_graph(), custom_options(dir.path(), file_names))
        .unwrap();
    let (files, summary) = generator.generate_files().unwrap();

    assert_eq!(names(&files), vec!["payment.js"]);
    assert_eq!(files[0].content, "// Payment from payment.proto\ncharge\nrefund\n");
    assert_eq!(summary.services, 1);
    assert_eq!(summary.methods, 0);
}

#[test]
fn test_singles_merge_into_reference_document() {
    let dir = template_dir(&[(
        "nodejs.examples.source.tera",
        "{% if method.name == \"Charge\" %}// @single(greeting)\nHello\n// @single-end()\n{% else %}// @single(greeting)\nHello\nWorld\n// @single-end()\n{% endif %}@reference Body @reference-end()",
    )]);
    let file_names = FileNames {
        examples_source: Some("{name}.example.js".to_string()),
        ..Default::default()
    };

    let generator = RpcGenerator::new(payment_graph(), custom_options(dir.path(), file_names))
        .unwrap();
    let (files, summary) = generator.generate_files().unwrap();

    assert_eq!(
        names(&files),
        vec!["Charge.example.js", "Refund.example.js", "reference.example.js"]
    );
    assert_eq!(find(&files, "Charge.example.js").content, "Hello\n");
    assert_eq!(find(&files, "Refund.example.js").content, "Hello\nWorld\n");
    assert_eq!(
        find(&files, "reference.example.js").content,
        "// @greeting\nHello\nWorld\n// @greeting-end()\n\n@reference Body @reference-end()\n@reference Body @reference-end()\n"
    );
    assert_eq!(summary.methods, 2);
    assert_eq!(summary.standalones, 0);
}

#[test]
fn test_singles_follow_method_order() {
    let dir = template_dir(&[(
        "nodejs.examples.source.tera",
        "{% if method.name == \"Charge\" %}// @single(shared)\nalpha\nbeta\n// @single-end()\n{% else %}// @single(refund)\nr\n// @single-end()\n// @single(shared)\nbeta\ngamma\n// @single-end()\n{% endif %}",
    )]);
    let file_names = FileNames {
        examples_source: Some("{name}.example.js".to_string()),
        ..Default::default()
    };

    let reference = |request: raw::CodeGeneratorRequest| {
        let graph = parse_request(&request.encode_to_vec()).unwrap();
        let generator =
            RpcGenerator::new(graph, custom_options(dir.path(), file_names.clone())).unwrap();
        let (files, _) = generator.generate_files().unwrap();
        find(&files, "reference.example.js").content.clone()
    };

    assert_eq!(
        reference(create_payment_request(true)),
        "// @shared\nalpha\nbeta\ngamma\n// @shared-end()\n\n// @refund\nr\n// @refund-end()\n"
    );

    let mut reversed = create_payment_request(true);
    reversed.proto_file[1].service[0].method.reverse();
    assert_eq!(
        reference(reversed),
        "// @refund\nr\n// @refund-end()\n\n// @shared\nbeta\ngamma\nalpha\n// @shared-end()\n"
    );
}

#[test]
fn test_nodejs_embedded_templates() {
    let mut options = options(TargetLanguage::NodeJs);
    options.output_dirs = OutputDirs::default()
        .with_dir(ArtifactKind::Examples, "examples")
        .with_dir(ArtifactKind::Tests, "test");

    let generator = RpcGenerator::new(payment_graph(), options).unwrap();
    let (files, summary) = generator.generate_files().unwrap();

    assert_eq!(
        names(&files),
        vec![
            "payment.js",
            "simulator.js",
            "examples/Charge.example.js",
            "test/Charge.test.js",
            "examples/Refund.example.js",
            "test/Refund.test.js",
            "examples/reference.example.js",
            "examples/nodejs_setup.example.js",
        ]
    );
    assert_eq!(summary.files, files.len());
    assert_eq!(summary.standalones, 1);

    let api = &find(&files, "payment.js").content;
    assert!(api.contains("Payment.prototype.charge = function (args)"));
    assert!(api.contains("\"ChargeCompleted\""));

    let simulator = &find(&files, "simulator.js").content;
    assert!(simulator.contains("handlers[\"Payment\"]"));
    assert!(simulator.contains("emit(\"RefundCompleted\", {});"));

    let example = &find(&files, "examples/Charge.example.js").content;
    assert!(example.starts_with("var ddp = require(\"ddp\");\nvar payment = ddp.Payment;\n"));
    assert!(example.contains("payment.charge({\n    amount: 1500,\n    currency: \"USD\"\n})"));
    assert!(example.contains(".onChargeProgress(function (response) {"));
    assert!(!example.contains('@'));
    assert!(!example.contains("describe("));

    let test = &find(&files, "test/Charge.test.js").content;
    assert!(test.contains("describe(\"Payment.Charge\""));
    assert!(test.contains("// Payment.Charge"));
    assert!(!test.contains("payment.charge({"));

    let reference = &find(&files, "examples/reference.example.js").content;
    assert!(reference.starts_with("// @standalone(setup)\n"));
    assert!(reference.contains("// @example\npayment.refund({\n    chargeId: \"ch_1\"\n})"));
    assert!(!reference.contains("describe("));

    assert_eq!(
        find(&files, "examples/nodejs_setup.example.js").content,
        "var ddp = require(\"ddp\");\nvar payment = ddp.Payment;\n"
    );
}

#[test]
fn test_generation_is_deterministic() {
    let first = RpcGenerator::new(payment_graph(), options(TargetLanguage::NodeJs))
        .unwrap()
        .generate()
        .unwrap();
    let second = RpcGenerator::new(payment_graph(), options(TargetLanguage::NodeJs))
        .unwrap()
        .generate()
        .unwrap();
    assert_eq!(first, second);
    assert!(first.error.is_none());
}

#[test]
fn test_objc_examples() {
    let generator = RpcGenerator::new(payment_graph(), options(TargetLanguage::ObjC))
        .unwrap()
        .with_beautifier(Box::new(Normalize));
    let (files, _) = generator.generate_files().unwrap();

    assert_eq!(
        names(&files),
        vec![
            "DDPExample.Charge.m",
            "DDPExample.Refund.m",
            "DDPExample.reference.m",
            "objc_DDPExample.setup.m",
        ]
    );
    let example = &find(&files, "DDPExample.Charge.m").content;
    assert!(example.contains("[[DDPPayment sharedInstance] charge:@{"));
    assert!(example.contains("@\"currency\": \"USD\""));
    assert_eq!(
        find(&files, "objc_DDPExample.setup.m").content,
        "#import <DDPSDK/DDPSDK.h>\n"
    );
}

#[test]
fn test_cpp_header() {
    let generator = RpcGenerator::new(payment_graph(), options(TargetLanguage::Cpp)).unwrap();
    let (files, summary) = generator.generate_files().unwrap();

    assert_eq!(names(&files), vec!["payment.ddprpc.h"]);
    let header = &files[0].content;
    assert!(header.contains("namespace payments {"));
    assert!(header.contains("class Payment {"));
    assert!(header.contains("virtual void charge("));
    assert!(header.contains("const std::string& charge_id"));
    assert!(header.contains("//   completion: ChargeCompleted"));
    assert!(header.contains("// API version 1.0\n"));
    assert!(header.contains("namespace payments {\n\nclass Payment {"));
    assert_eq!(summary.methods, 0);
}

#[test]
fn test_cpp_services_namespace() {
    let mut options = options(TargetLanguage::Cpp);
    options.services_namespace = Some("services".to_string());

    let generator = RpcGenerator::new(payment_graph(), options).unwrap();
    let (files, _) = generator.generate_files().unwrap();

    let header = &find(&files, "payment.ddprpc.h").content;
    assert!(header.contains("namespace payments {\n\nnamespace services {\n\nclass Payment {"));
    assert!(header.contains("};\n\n}  // namespace services\n\n}  // namespace payments\n"));
}

#[test]
fn test_cpp_requires_api_version() {
    for file_options in [
        file_options(None, Some(0), false),
        file_options(Some(1), None, false),
        Vec::new(),
    ] {
        let generator = RpcGenerator::new(
            payment_graph_with_options(file_options),
            options(TargetLanguage::Cpp),
        )
        .unwrap();
        let err = generator.generate().unwrap_err();
        assert!(matches!(err, GeneratorError::Input(ref m) if m.contains("payment.proto")));
    }
}

#[test]
fn test_cpp_rejects_generic_services() {
    let graph = payment_graph_with_options(file_options(Some(1), Some(0), true));
    let generator = RpcGenerator::new(graph, options(TargetLanguage::Cpp)).unwrap();

    let err = generator.generate().unwrap_err();
    assert!(matches!(err, GeneratorError::Input(ref m) if m.contains("cc_generic_services")));
}

#[test]
fn test_version_checks_are_cpp_only() {
    let graph = payment_graph_with_options(file_options(None, None, true));
    let generator = RpcGenerator::new(graph, options(TargetLanguage::NodeJs)).unwrap();
    assert!(generator.generate().is_ok());
}

#[test]
fn test_cpp_requires_completion_response() {
    let graph = parse_request(&create_payment_request(false).encode_to_vec()).unwrap();
    let generator = RpcGenerator::new(graph, options(TargetLanguage::Cpp)).unwrap();

    let err = generator.generate().unwrap_err();
    assert!(matches!(err, GeneratorError::Input(ref m) if m.contains(".payments.Payment.Refund")));
}

#[test]
fn test_zero_services() {
    let request = raw::CodeGeneratorRequest {
        proto_file: vec![raw::FileDescriptorProto {
            name: Some("empty.proto".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let graph = parse_request(&request.encode_to_vec()).unwrap();

    let result = RpcGenerator::new(graph, options(TargetLanguage::NodeJs))
        .unwrap()
        .generate();
    assert!(matches!(result, Err(GeneratorError::Input(_))));
}

#[test]
fn test_missing_template() {
    let dir = template_dir(&[("nodejs.api.source.tera", "api")]);
    let file_names = FileNames {
        api_source: Some("{name}.js".to_string()),
        simulator_source: Some("simulator.js".to_string()),
        ..Default::default()
    };

    let generator = RpcGenerator::new(payment_graph(), custom_options(dir.path(), file_names))
        .unwrap();
    let err = generator.generate().unwrap_err();
    assert!(matches!(
        err,
        GeneratorError::MissingTemplate { ref kind, ref role, .. }
            if kind == "simulator" && role == "source"
    ));
}

#[test]
fn test_missing_example_value() {
    let dir = template_dir(&[(
        "nodejs.examples.source.tera",
        "// @example\n{{ 'tip' | get_example_value_for_field }}\n// @example-end()\n",
    )]);
    let file_names = FileNames {
        examples_source: Some("{name}.example.js".to_string()),
        ..Default::default()
    };

    let generator = RpcGenerator::new(payment_graph(), custom_options(dir.path(), file_names))
        .unwrap();
    let err = generator.generate().unwrap_err();
    assert!(matches!(err, GeneratorError::MissingExampleValue(ref f) if f == "tip"));
}

#[test]
fn test_unterminated_region_aborts() {
    let dir = template_dir(&[(
        "nodejs.examples.source.tera",
        "// @example\nrun();\n",
    )]);
    let file_names = FileNames {
        examples_source: Some("{name}.example.js".to_string()),
        ..Default::default()
    };

    let generator = RpcGenerator::new(payment_graph(), custom_options(dir.path(), file_names))
        .unwrap();
    let err = generator.generate().unwrap_err();
    assert!(matches!(err, GeneratorError::Markup(ref m) if m.contains(".payments.Payment.Charge")));
}

#[test]
fn test_builtin_profile_is_used() {
    let profile = LanguageProfile::for_language(TargetLanguage::NodeJs);
    let generator = RpcGenerator::new(payment_graph(), options(TargetLanguage::NodeJs)).unwrap();
    assert_eq!(generator.profile(), &profile);
}
