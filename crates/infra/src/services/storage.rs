//! Uploads into the blob buckets. Downloads are public.

use opsconsole_auth::{
    Principal, authorize,
    permissions::{OPERATIONS_WRITE, WAREHOUSE_REQUESTS_CREATE, WAREHOUSE_WRITE},
};
use opsconsole_core::DomainError;

use super::{ServiceResult, Services};
use crate::blob::{Bucket, validate_path};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

impl Services {
    /// Avatars live under the owner's user id; the other buckets follow the
    /// write permission of the records that reference them.
    fn ensure_can_upload(&self, principal: &Principal, bucket: Bucket, path: &str) -> ServiceResult<()> {
        match bucket {
            Bucket::ItemImages => authorize(principal, &WAREHOUSE_WRITE)?,
            Bucket::ApprovalProofs => authorize(principal, &WAREHOUSE_REQUESTS_CREATE)?,
            Bucket::FieldPhotos => authorize(principal, &OPERATIONS_WRITE)?,
            Bucket::Avatars => {
                let owner = path.split('/').next().unwrap_or_default();
                if owner != principal.user_id.to_string() && !principal.is_super_admin() {
                    return Err(DomainError::validation(
                        "avatar paths must start with your user id",
                    )
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Returns the public URL of the stored object.
    pub async fn upload(
        &self,
        principal: &Principal,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
    ) -> ServiceResult<String> {
        let path = validate_path(path)?;
        self.ensure_can_upload(principal, bucket, &path)?;
        if bytes.is_empty() {
            return Err(DomainError::validation("upload is empty").into());
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(DomainError::validation(format!(
                "upload exceeds {MAX_UPLOAD_BYTES} bytes"
            ))
            .into());
        }
        let size = bytes.len();
        let url = match bucket {
            // Shared across departments, so an upload may not replace
            // someone else's object.
            Bucket::ItemImages | Bucket::FieldPhotos => {
                self.blobs.create(bucket, &path, bytes).await?
            }
            Bucket::ApprovalProofs | Bucket::Avatars => self.blobs.put(bucket, &path, bytes).await?,
        };
        tracing::info!(%bucket, %path, size, user_id = %principal.user_id, "object uploaded");
        Ok(url)
    }

    pub async fn download(&self, bucket: Bucket, path: &str) -> ServiceResult<Vec<u8>> {
        Ok(self.blobs.get(bucket, path).await?)
    }
}

#[cfg(test)]
mod tests {
    use opsconsole_auth::AppRole;

    use super::*;
    use crate::blob::BlobError;
    use crate::services::{ServiceError, testing};

    #[tokio::test]
    async fn uploads_follow_bucket_rules() {
        let services = testing::services();
        let wh = testing::department(&services, "WH").await;
        let staff = testing::user(&services, "s@ops.test", AppRole::Staff, Some(wh.id)).await;
        let keeper = testing::user(&services, "k@ops.test", AppRole::Supervisor, Some(wh.id)).await;

        assert!(matches!(
            services
                .upload(&staff, Bucket::ItemImages, "gloves.png", vec![1, 2, 3])
                .await,
            Err(ServiceError::Authz(_))
        ));
        let url = services
            .upload(&keeper, Bucket::ItemImages, "gloves.png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(url, "/storage/item-images/gloves.png");
        assert_eq!(
            services.download(Bucket::ItemImages, "gloves.png").await.unwrap(),
            vec![1, 2, 3]
        );

        let own = format!("{}/me.jpg", staff.user_id);
        services.upload(&staff, Bucket::Avatars, &own, vec![9]).await.unwrap();
        let theirs = format!("{}/me.jpg", keeper.user_id);
        assert!(matches!(
            services.upload(&staff, Bucket::Avatars, &theirs, vec![9]).await,
            Err(ServiceError::Domain(DomainError::Validation(_)))
        ));
        assert!(matches!(
            services.upload(&staff, Bucket::Avatars, "../etc/passwd", vec![9]).await,
            Err(ServiceError::Blob(BlobError::InvalidPath(_)))
        ));
    }

    #[tokio::test]
    async fn shared_bucket_objects_cannot_be_overwritten() {
        let services = testing::services();
        let wh = testing::department(&services, "WH").await;
        let ops = testing::department(&services, "OPS").await;
        let keeper = testing::user(&services, "k@ops.test", AppRole::Supervisor, Some(wh.id)).await;
        let rival = testing::user(&services, "r@ops.test", AppRole::Supervisor, Some(ops.id)).await;

        services
            .upload(&keeper, Bucket::ItemImages, "pump.png", vec![1])
            .await
            .unwrap();
        assert!(matches!(
            services.upload(&rival, Bucket::ItemImages, "pump.png", vec![2]).await,
            Err(ServiceError::Blob(BlobError::AlreadyExists { .. }))
        ));
        assert_eq!(
            services.download(Bucket::ItemImages, "pump.png").await.unwrap(),
            vec![1]
        );

        services
            .upload(&rival, Bucket::FieldPhotos, "site/1.jpg", vec![5])
            .await
            .unwrap();
        assert!(matches!(
            services.upload(&keeper, Bucket::FieldPhotos, "site/1.jpg", vec![6]).await,
            Err(ServiceError::Blob(BlobError::AlreadyExists { .. }))
        ));

        // Avatars stay replaceable by their owner.
        let own = format!("{}/me.jpg", keeper.user_id);
        services.upload(&keeper, Bucket::Avatars, &own, vec![1]).await.unwrap();
        services.upload(&keeper, Bucket::Avatars, &own, vec![2]).await.unwrap();
    }
}
