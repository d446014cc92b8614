use relate_domain::{
    apply_entity_filters, EntityFilter, ProjectDbms, RegistryError, RegistryResult,
};
use tracing::info;

use super::ProjectRegistry;

impl ProjectRegistry {
    pub async fn list_dbmss(
        &self,
        project: &str,
        filters: &[EntityFilter],
    ) -> RegistryResult<Vec<ProjectDbms>> {
        let project = self.get(project).await?;
        Ok(apply_entity_filters(project.manifest.dbmss, filters))
    }

    /// Links a database instance; both its name and its connection URI must be unused.
    pub async fn add_dbms(&self, project: &str, dbms: ProjectDbms) -> RegistryResult<ProjectDbms> {
        let project = self.get(project).await?;
        let added = dbms.clone();
        self.update_manifest(&project, move |manifest| {
            if let Some(found) = manifest
                .dbmss
                .iter()
                .find(|entry| entry.collides_with(&dbms))
            {
                return Err(RegistryError::invalid_argument(format!(
                    "Dbms \"{}\" already exists in project",
                    found.name
                )));
            }
            manifest.dbmss.push(dbms);
            Ok(())
        })
        .await?;
        info!(project = %project.name(), dbms = %added.name, "added project dbms");
        Ok(added)
    }

    pub async fn remove_dbms(&self, project: &str, dbms_name: &str) -> RegistryResult<ProjectDbms> {
        let project = self.get(project).await?;
        let removed = self
            .update_manifest(&project, |manifest| {
                let index = manifest
                    .dbmss
                    .iter()
                    .position(|entry| entry.name == dbms_name)
                    .ok_or_else(|| {
                        RegistryError::invalid_argument(format!("Dbms \"{dbms_name}\" not found"))
                    })?;
                Ok(manifest.dbmss.remove(index))
            })
            .await?;
        info!(project = %project.name(), dbms = %dbms_name, "removed project dbms");
        Ok(removed)
    }
}
