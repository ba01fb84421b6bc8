// src/api/catalogue.rs

use async_trait::async_trait;

use super::{Access, ApiClient, MaterialBackend};
use crate::{
    error::ClientError,
    models::{
        material::{Material, MaterialPayload, Section},
        progress::{MaterialTestResult, SubmitMaterialTestRequest},
        question::Test,
    },
    routes,
};

impl ApiClient {
    pub async fn sections(&self) -> Result<Vec<Section>, ClientError> {
        self.get_json(routes::SECTIONS, Access::Authenticated).await
    }

    pub async fn materials_by_section(&self, section_id: i64) -> Result<Vec<Material>, ClientError> {
        self.get_json(&routes::materials_by_section(section_id), Access::Authenticated)
            .await
    }
}

#[async_trait]
impl MaterialBackend for ApiClient {
    async fn material(&self, material_id: i64) -> Result<Material, ClientError> {
        let payload: MaterialPayload = self
            .get_json(&routes::material(material_id), Access::Authenticated)
            .await?;

        payload
            .into_first()
            .ok_or_else(|| ClientError::NotFound(format!("Material {} not found", material_id)))
    }

    async fn tests_by_material(&self, material_id: i64) -> Result<Vec<Test>, ClientError> {
        self.get_json(&routes::tests_by_material(material_id), Access::Authenticated)
            .await
    }

    async fn submit_material_test(
        &self,
        request: &SubmitMaterialTestRequest,
    ) -> Result<MaterialTestResult, ClientError> {
        self.post_json(routes::PROGRESS_SUBMIT_TEST, request, Access::Authenticated)
            .await
    }
}
