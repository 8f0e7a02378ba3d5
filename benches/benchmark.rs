use std::sync::Arc;

use benchmark_simple::*;
use jwe_key_management::prelude::*;

fn main() {
    let bench = Bench::new();

    let options = &Options {
        iterations: 1000,
        warmup_iterations: 100,
        min_samples: 5,
        max_samples: 10,
        max_rsd: 1.0,
        ..Default::default()
    };

    let engines: Vec<Arc<dyn CryptoEngine>> = vec![Arc::new(RustCryptoEngine), default_engine()];
    for engine in engines {
        let km = KeyManager::new(engine);
        let name = km.engine().name();

        let recipient = EcPrivateKey::generate(Curve::P256).unwrap();
        let pk: Key = recipient.public_key().clone().into();
        let sk: Key = recipient.into();
        let params = KeyManagementParameters::default();

        let res = km
            .encrypt_key_management("ECDH-ES+A256KW", "A256GCM", &pk, None, &params, None)
            .unwrap();
        let header = res.parameters.unwrap();
        let encrypted_key = res.encrypted_key.unwrap();

        let km2 = km.clone();
        let r = bench.run(options, move || {
            km2.encrypt_key_management("ECDH-ES+A256KW", "A256GCM", &pk, None, &params, None)
                .unwrap()
        });
        println!("{} - p256 ECDH-ES+A256KW - encrypt: {}", name, r.throughput(1));

        let r = bench.run(options, move || {
            km.decrypt_key_management(
                "ECDH-ES+A256KW",
                "A256GCM",
                &sk,
                Some(encrypted_key.as_slice()),
                &header,
                None,
            )
            .unwrap()
        });
        println!("{} - p256 ECDH-ES+A256KW - decrypt: {}", name, r.throughput(1));
    }

    let km = KeyManager::default();
    let password: Key = SecretKey::from_bytes(b"benchmark password").into();
    let params = KeyManagementParameters::default();
    let r = bench.run(options, move || {
        km.encrypt_key_management("PBES2-HS256+A128KW", "A128GCM", &password, None, &params, None)
            .unwrap()
    });
    println!("PBES2-HS256+A128KW (p2c=2048) - encrypt: {}", r.throughput(1));
}
