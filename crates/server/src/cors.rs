use ascii::AsciiString;
use config::{AnyOrArray, AnyOrHttpMethodArray, AnyOrUrlArray, CorsConfig};
use http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};

pub(super) fn generate(
    CorsConfig {
        allow_credentials,
        allow_origins,
        max_age,
        allow_methods,
        allow_headers,
        expose_headers,
        allow_private_network,
    }: &CorsConfig,
) -> CorsLayer {
    let mut cors_layer = CorsLayer::new()
        .allow_credentials(*allow_credentials)
        .allow_private_network(*allow_private_network);

    if let Some(allow_origins) = allow_origins {
        cors_layer = cors_layer.allow_origin(origins(allow_origins));
    }

    if let Some(max_age) = max_age {
        cors_layer = cors_layer.max_age(*max_age);
    }

    if let Some(allow_methods) = allow_methods {
        cors_layer = cors_layer.allow_methods(methods(allow_methods));
    }

    if let Some(allow_headers) = allow_headers {
        cors_layer = cors_layer.allow_headers(match allow_headers {
            AnyOrArray::Any => AllowHeaders::any(),
            AnyOrArray::Explicit(headers) => AllowHeaders::list(header_names(headers)),
        });
    }

    if let Some(expose_headers) = expose_headers {
        cors_layer = cors_layer.expose_headers(match expose_headers {
            AnyOrArray::Any => ExposeHeaders::any(),
            AnyOrArray::Explicit(headers) => ExposeHeaders::list(header_names(headers)),
        });
    }

    cors_layer
}

fn origins(allow_origins: &AnyOrUrlArray) -> AllowOrigin {
    let origins = match allow_origins {
        AnyOrArray::Any => return AllowOrigin::any(),
        AnyOrArray::Explicit(origins) => origins,
    };

    let mut constants = Vec::new();
    let mut globs = Vec::new();

    for origin in origins {
        let origin = &origin[..url::Position::BeforePath];

        if origin.chars().any(|c| "?*[]{}!\\".contains(c)) {
            globs.push(origin.to_owned());
            continue;
        }

        match HeaderValue::from_str(origin) {
            Ok(value) => constants.push(value),
            Err(e) => log::warn!("Ignoring CORS origin '{origin}': {e}"),
        }
    }

    if globs.is_empty() {
        return AllowOrigin::list(constants);
    }

    AllowOrigin::predicate(move |origin, _| {
        if constants.iter().any(|constant| constant == origin) {
            return true;
        }

        let Ok(origin) = origin.to_str() else {
            return false;
        };

        globs.iter().any(|glob| fast_glob::glob_match(glob, origin))
    })
}

fn methods(allow_methods: &AnyOrHttpMethodArray) -> AllowMethods {
    match allow_methods {
        AnyOrArray::Any => AllowMethods::any(),
        AnyOrArray::Explicit(methods) => {
            let mut methods: Vec<Method> = methods.iter().map(|method| Method::from(*method)).collect();

            // Preflight requests must always be answerable.
            if !methods.contains(&Method::OPTIONS) {
                methods.push(Method::OPTIONS);
            }

            AllowMethods::list(methods)
        }
    }
}

fn header_names(headers: &[AsciiString]) -> Vec<HeaderName> {
    headers
        .iter()
        .filter_map(|header| match HeaderName::from_bytes(header.as_bytes()) {
            Ok(name) => Some(name),
            Err(e) => {
                log::warn!("Ignoring CORS header '{header}': {e}");
                None
            }
        })
        .collect()
}
