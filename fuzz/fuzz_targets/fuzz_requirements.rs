//! Fuzz target for requirements file parsing.

#![no_main]

use awsible::galaxy::RequirementsFile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(requirements) = RequirementsFile::from_str(content, "requirements.yml") {
        let _ = requirements.role_names();
        if let Ok(yaml) = requirements.to_yaml() {
            let reparsed = RequirementsFile::from_str(&yaml, "requirements.yml")
                .expect("serialized requirements must parse");
            assert_eq!(reparsed.roles.len(), requirements.roles.len());
        }
    }
});
