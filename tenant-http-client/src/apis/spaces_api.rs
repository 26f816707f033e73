use super::{Error, authorized, configuration, endpoint, read_json};
use crate::models::{SpaceRequest, SpaceResource};

pub async fn create_space(
    configuration: &configuration::Configuration,
    space_request: SpaceRequest,
) -> Result<SpaceResource, Error> {
    let url = endpoint(configuration, "/v2/spaces")?;
    let request = authorized(configuration, configuration.client.post(url)).await?;
    read_json(request.json(&space_request).send().await?).await
}
