//! Flux text-to-image models served through the fal.ai queue

use crate::error::SchemaError;
use crate::types::{ItemSpec, ModelSchema, ParameterSpec, ParameterType, PropertyDefinition};

const IMAGE_SIZES: [&str; 6] = [
    "square_hd",
    "square",
    "portrait_4_3",
    "portrait_16_9",
    "landscape_4_3",
    "landscape_16_9",
];

const SAFETY_TOLERANCES: [&str; 6] = ["1", "2", "3", "4", "5", "6"];

const OUTPUT_FORMATS: [&str; 2] = ["jpeg", "png"];

/// Response shape shared by every Flux endpoint.
fn image_output_schema() -> Result<Vec<ParameterSpec>, SchemaError> {
    let image = ItemSpec::objects([
        ("url", PropertyDefinition::new(ParameterType::String)),
        ("width", PropertyDefinition::new(ParameterType::Number)),
        ("height", PropertyDefinition::new(ParameterType::Number)),
        ("content_type", PropertyDefinition::new(ParameterType::String)),
    ]);
    Ok(vec![
        ParameterSpec::array("images", image).build()?,
        ParameterSpec::number("seed").build()?,
        ParameterSpec::array("has_nsfw_concepts", ItemSpec::of(ParameterType::Boolean)).build()?,
    ])
}

fn prompt() -> Result<ParameterSpec, SchemaError> {
    ParameterSpec::string("prompt").required().build()
}

fn output_format() -> Result<ParameterSpec, SchemaError> {
    ParameterSpec::enumeration("output_format", OUTPUT_FORMATS)
        .default("jpeg")
        .build()
}

pub fn flux_1_1_pro() -> Result<ModelSchema, SchemaError> {
    ModelSchema::new(
        "Flux 1.1 Pro",
        "fal-ai/flux-pro/v1.1",
        vec![
            prompt()?,
            ParameterSpec::enumeration("image_size", IMAGE_SIZES)
                .default("portrait_4_3")
                .build()?,
            ParameterSpec::boolean("sync_mode").default(false).build()?,
            ParameterSpec::number("num_images").default(1).build()?,
            ParameterSpec::boolean("enable_safety_checker").default(false).build()?,
            ParameterSpec::enumeration("safety_tolerance", SAFETY_TOLERANCES)
                .default("6")
                .build()?,
            output_format()?,
            ParameterSpec::number("seed").build()?,
        ],
        image_output_schema()?,
    )
}

pub fn flux_1_1_pro_ultra() -> Result<ModelSchema, SchemaError> {
    ModelSchema::new(
        "Flux 1.1 Pro Ultra",
        "fal-ai/flux-pro/v1.1-ultra",
        vec![
            prompt()?,
            ParameterSpec::enumeration(
                "aspect_ratio",
                ["21:9", "16:9", "4:3", "1:1", "3:4", "9:16", "9:21"],
            )
            .default("16:9")
            .build()?,
            ParameterSpec::boolean("sync_mode").default(false).build()?,
            ParameterSpec::number("num_images").default(1).build()?,
            ParameterSpec::boolean("enable_safety_checker").default(false).build()?,
            ParameterSpec::enumeration("safety_tolerance", SAFETY_TOLERANCES)
                .default("6")
                .build()?,
            output_format()?,
            ParameterSpec::boolean("raw").build()?,
            ParameterSpec::number("seed").build()?,
        ],
        image_output_schema()?,
    )
}

pub fn flux_lora() -> Result<ModelSchema, SchemaError> {
    let lora = ItemSpec::objects([
        (
            "path",
            PropertyDefinition::new(ParameterType::String)
                .with_description("URL or path to the LoRA weights"),
        ),
        (
            "scale",
            PropertyDefinition::new(ParameterType::Number)
                .with_description("Scale factor for the LoRA weight (0 to 2)")
                .with_range(0.0, 2.0)
                .with_default(1),
        ),
    ]);

    ModelSchema::new(
        "Flux LoRA",
        "fal-ai/flux-lora",
        vec![
            prompt()?,
            ParameterSpec::enumeration("image_size", IMAGE_SIZES)
                .default("landscape_4_3")
                .build()?,
            ParameterSpec::number("num_inference_steps")
                .default(35)
                .range(1.0, 50.0)
                .build()?,
            ParameterSpec::number("guidance_scale")
                .default(3.5)
                .range(1.0, 10.0)
                .build()?,
            ParameterSpec::number("seed").build()?,
            ParameterSpec::array("loras", lora)
                .description("LoRA weights to use for image generation")
                .build()?,
            ParameterSpec::boolean("sync_mode").default(false).build()?,
            ParameterSpec::number("num_images").default(1).build()?,
            ParameterSpec::boolean("enable_safety_checker").default(true).build()?,
            output_format()?,
        ],
        image_output_schema()?,
    )
}
