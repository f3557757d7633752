use serde::Serialize;

use crate::{runtime::ContainerRuntime, CoderunnerResult};

use super::{ImageRegistry, Language};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// What happened to an image during [`ensure_images`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAction {
    /// The image was already present.
    Present,
    /// The image was built.
    Built,
}

/// The state of one registry image after [`ensure_images`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageStatus {
    /// The language the image serves.
    pub language: Language,

    /// The image reference.
    pub image_ref: String,

    /// What was done.
    pub action: ImageAction,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Makes sure every registry image is present, building the missing ones.
///
/// With `force` every image is rebuilt. Stops at the first failed build.
pub async fn ensure_images(
    runtime: &dyn ContainerRuntime,
    registry: &ImageRegistry,
    force: bool,
) -> CoderunnerResult<Vec<ImageStatus>> {
    let mut statuses = Vec::new();

    for image in registry.iter() {
        if !force && runtime.image_exists(&image.image_ref).await? {
            tracing::debug!("image {} already present", image.image_ref);
            statuses.push(ImageStatus {
                language: image.language,
                image_ref: image.image_ref.clone(),
                action: ImageAction::Present,
            });
            continue;
        }

        runtime
            .build_image(&image.image_ref, image.dockerfile)
            .await
            .inspect_err(|e| tracing::error!("failed to build {} image: {}", image.language, e))?;

        statuses.push(ImageStatus {
            language: image.language,
            image_ref: image.image_ref.clone(),
            action: ImageAction::Built,
        });
    }

    Ok(statuses)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{runtime::MockRuntime, CoderunnerError};

    #[tokio::test]
    async fn test_only_missing_images_are_built() -> CoderunnerResult<()> {
        let runtime = MockRuntime::echo().with_images(["codezy-java-runner:latest"]);
        let registry = ImageRegistry::default();

        let statuses = ensure_images(&runtime, &registry, false).await?;
        let actions: Vec<_> = statuses.iter().map(|s| (s.language, s.action)).collect();
        assert_eq!(
            actions,
            vec![
                (Language::Python, ImageAction::Built),
                (Language::Java, ImageAction::Present),
                (Language::Cpp, ImageAction::Built),
            ]
        );
        assert_eq!(
            runtime.built(),
            vec!["codezy-python-runner:latest", "codezy-cpp-runner:latest"]
        );

        let statuses = ensure_images(&runtime, &registry, true).await?;
        assert!(statuses.iter().all(|s| s.action == ImageAction::Built));
        Ok(())
    }

    #[tokio::test]
    async fn test_build_failure_stops_the_run() {
        let runtime = MockRuntime::echo().with_failing_build("codezy-java-runner:latest");
        let result = ensure_images(&runtime, &ImageRegistry::default(), false).await;

        assert!(matches!(result, Err(CoderunnerError::ImageBuild { image, .. }) if image == "codezy-java-runner:latest"));
        assert_eq!(runtime.built(), vec!["codezy-python-runner:latest"]);
    }
}
