/**
 * MQTT LISTENER - Canal push des événements de menace
 *
 * RÔLE : Abonnement au topic des détections et ingestion unitaire dans le
 * feed, dans l'ordre de livraison. Un message invalide est jeté ; une
 * erreur de connexion se résout par une nouvelle tentative après pause.
 */

use crate::config::{KernelConfig, MqttConf};
use crate::feed::SharedFeed;
use crate::models::ThreatEvent;
use crate::state::Shared;
use rumqttc::{AsyncClient, Event, MqttOptions, QoS};
use tokio::task;

pub const DETECTED_TOPIC: &str = "threatmap/events/detected@v1";

pub fn spawn_mqtt_listener(feed: SharedFeed, cfg: Shared<KernelConfig>) {
    let mqtt_cfg = cfg.lock().mqtt.clone().unwrap_or(MqttConf {
        host: "localhost".into(),
        port: 1883,
    });

    task::spawn(async move {
        let mut opts = MqttOptions::new("threatmap-kernel", &mqtt_cfg.host, mqtt_cfg.port);
        opts.set_keep_alive(std::time::Duration::from_secs(15));
        let (client, mut eventloop) = AsyncClient::new(opts, 10);
        if let Err(e) = client.subscribe(DETECTED_TOPIC, QoS::AtLeastOnce).await {
            eprintln!("[kernel] subscribe MQTT failed: {e:?}");
            return;
        }

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(rumqttc::Incoming::Publish(p))) if p.topic == DETECTED_TOPIC => {
                    if let Ok(txt) = String::from_utf8(p.payload.to_vec()) {
                        match serde_json::from_str::<ThreatEvent>(&txt) {
                            // ordre de livraison = ordre d'application, pas de batch
                            Ok(event) => feed.lock().ingest_one(event),
                            Err(_) => eprintln!("[kernel] événement JSON invalide: {txt}"),
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("[kernel] MQTT erreur: {:?}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                }
            }
        }
    });
}
