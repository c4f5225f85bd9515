/// Placeholder rewriting
///
/// Manifests carry hostnames of the infrastructure that produced them. They
/// are swapped for our own hostnames on the raw JSON text, so URLs are fixed
/// wherever they appear, including fields we know nothing about.
use crate::{
    config::RewriteConfig,
    error::{HxResult, ManifestError},
    manifest::provider::ProviderConfig,
};
use serde_json::Value;

/// Replace a source's manifests/images placeholders with our own hostnames
pub fn fix_placeholders(
    text: &str,
    source: &ProviderConfig,
    hx_servers: &ProviderConfig,
    replace_https: bool,
) -> String {
    let mut fixed = replace_nonempty(
        text,
        &source.manifests.placeholder,
        &hx_servers.manifests.hostname,
    );
    fixed = replace_nonempty(&fixed, &source.images.placeholder, &hx_servers.images.hostname);

    if replace_https {
        for hostname in [&hx_servers.manifests.hostname, &hx_servers.images.hostname] {
            fixed = fixed.replace(
                &format!("https://{}", hostname),
                &format!("http://{}", hostname),
            );
        }
    }

    fixed
}

fn replace_nonempty(text: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        text.to_string()
    } else {
        text.replace(from, to)
    }
}

/// Parse rewritten text, reporting breakage as a server-side failure
pub fn parse_rewritten(text: &str, manifest_id: &str) -> HxResult<Value> {
    serde_json::from_str(text).map_err(|e| {
        ManifestError::RewriteFailure(format!(
            "rewritten manifest ({}) is not valid json - {}",
            manifest_id, e
        ))
    })
}

/// Pin every image service of a local manifest to our image API version
///
/// Walks `sequences[].canvases[].images[].resource.service` and overwrites
/// `@context` and `profile`. Returns the number of services touched.
pub fn normalize_image_services(manifest: &mut Value, config: &RewriteConfig) -> usize {
    let mut touched = 0;

    let Some(sequences) = manifest.get_mut("sequences").and_then(Value::as_array_mut) else {
        return 0;
    };

    for sequence in sequences {
        let Some(canvases) = sequence.get_mut("canvases").and_then(Value::as_array_mut) else {
            continue;
        };
        for canvas in canvases {
            let Some(images) = canvas.get_mut("images").and_then(Value::as_array_mut) else {
                continue;
            };
            for image in images {
                let service = image
                    .get_mut("resource")
                    .and_then(|r| r.get_mut("service"))
                    .and_then(Value::as_object_mut);
                if let Some(service) = service {
                    service.insert(
                        "@context".to_string(),
                        Value::String(config.image_service_context.clone()),
                    );
                    service.insert(
                        "profile".to_string(),
                        Value::String(config.image_service_profile.clone()),
                    );
                    touched += 1;
                }
            }
        }
    }

    touched
}
