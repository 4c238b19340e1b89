//! Naming scheme for per-partner secrets: `<partner>-<purpose>-<env>`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerSecretNames {
    partner_id: String,
    environment: String,
}

impl PartnerSecretNames {
    pub fn new(partner_id: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            partner_id: partner_id.into(),
            environment: environment.into(),
        }
    }

    pub fn partner_id(&self) -> &str {
        &self.partner_id
    }

    fn name(&self, purpose: &str) -> String {
        format!("{}-{}-{}", self.partner_id, purpose, self.environment)
    }

    pub fn sftp_private_key(&self) -> String {
        self.name("sftp-private-key")
    }

    pub fn sftp_public_key(&self) -> String {
        self.name("sftp-public-key")
    }

    pub fn sftp_user(&self) -> String {
        self.name("sftp-user")
    }

    pub fn sftp_server_address(&self) -> String {
        self.name("sftp-server-address")
    }

    pub fn sftp_starting_directory(&self) -> String {
        self.name("sftp-starting-directory")
    }

    pub fn zip_password(&self) -> String {
        self.name("zip-password")
    }

    pub fn report_stream_private_key(&self) -> String {
        self.name("reportstream-private-key")
    }
}
